//! Schema catalog: classes, properties, and indexes, plus the monotonic
//! id counters that back them. Sits on the generic `KvTxn` contract so it
//! runs unmodified over any conforming KV engine (§4.2's non-goal).

use nogdb_api::kv::{encode_u16_key, encode_u32_key};
use nogdb_api::{
    ClassId, ClassType, Error, IndexId, KvCursor, KvTxn, PropertyId, PropertyType, Result,
    StoreFlags, StoreHandle, MAX_CLASS_ID,
};
use std::collections::HashMap;

pub const STORE_DBINFO: &str = ".dbinfo";
pub const STORE_CLASSES: &str = ".classes";
pub const STORE_PROPERTIES: &str = ".properties";
pub const STORE_INDEXES: &str = ".indexes";

const KEY_MAX_CLASS_ID: &str = "?max_class_id";
const KEY_NUM_CLASS_ID: &str = "?num_class_id";
const KEY_MAX_PROPERTY_ID: &str = "?max_property_id";
const KEY_NUM_PROPERTY_ID: &str = "?num_property_id";
const KEY_MAX_INDEX_ID: &str = "?max_index_id";
const KEY_NUM_INDEX_ID: &str = "?num_index_id";

pub const MAX_PROPERTY_ID: PropertyId = PropertyId::MAX - 1;
pub const MAX_INDEX_ID: IndexId = IndexId::MAX - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub id: ClassId,
    pub name: String,
    pub class_type: ClassType,
    pub super_id: Option<ClassId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub id: PropertyId,
    pub owner_class_id: ClassId,
    pub name: String,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub id: IndexId,
    pub property_id: PropertyId,
    pub unique: bool,
}

fn encode_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_ne_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn decode_string(bytes: &[u8], off: &mut usize) -> Result<String> {
    let len = u32::from_ne_bytes(bytes[*off..*off + 4].try_into().unwrap()) as usize;
    *off += 4;
    let s = String::from_utf8(bytes[*off..*off + len].to_vec())
        .map_err(|_| Error::Internal("catalog entry name is not utf8".into()))?;
    *off += len;
    Ok(s)
}

fn encode_class(def: &ClassDef) -> Vec<u8> {
    let mut out = Vec::new();
    encode_string(&mut out, &def.name);
    out.push(match def.class_type {
        ClassType::Vertex => 0,
        ClassType::Edge => 1,
    });
    match def.super_id {
        Some(id) => {
            out.push(1);
            out.extend_from_slice(&id.to_ne_bytes());
        }
        None => out.push(0),
    }
    out
}

fn decode_class(id: ClassId, bytes: &[u8]) -> Result<ClassDef> {
    let mut off = 0usize;
    let name = decode_string(bytes, &mut off)?;
    let class_type = match bytes[off] {
        0 => ClassType::Vertex,
        1 => ClassType::Edge,
        _ => return Err(Error::Internal("bad class type tag".into())),
    };
    off += 1;
    let super_id = if bytes[off] == 1 {
        off += 1;
        Some(ClassId::from_ne_bytes(bytes[off..off + 2].try_into().unwrap()))
    } else {
        None
    };
    Ok(ClassDef {
        id,
        name,
        class_type,
        super_id,
    })
}

fn encode_property(def: &PropertyDef) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&def.id.to_ne_bytes());
    encode_string(&mut out, &def.name);
    out.push(property_type_tag(def.property_type));
    out
}

fn decode_property(owner_class_id: ClassId, bytes: &[u8]) -> Result<PropertyDef> {
    let mut off = 0usize;
    let id = PropertyId::from_ne_bytes(bytes[off..off + 2].try_into().unwrap());
    off += 2;
    let name = decode_string(bytes, &mut off)?;
    let property_type = property_type_from_tag(bytes[off])?;
    Ok(PropertyDef {
        id,
        owner_class_id,
        name,
        property_type,
    })
}

fn property_type_tag(ty: PropertyType) -> u8 {
    use PropertyType::*;
    match ty {
        TinyInt => 0,
        UnsignedTinyInt => 1,
        SmallInt => 2,
        UnsignedSmallInt => 3,
        Integer => 4,
        UnsignedInteger => 5,
        BigInt => 6,
        UnsignedBigInt => 7,
        Real => 8,
        Text => 9,
        Blob => 10,
    }
}

fn property_type_from_tag(tag: u8) -> Result<PropertyType> {
    use PropertyType::*;
    Ok(match tag {
        0 => TinyInt,
        1 => UnsignedTinyInt,
        2 => SmallInt,
        3 => UnsignedSmallInt,
        4 => Integer,
        5 => UnsignedInteger,
        6 => BigInt,
        7 => UnsignedBigInt,
        8 => Real,
        9 => Text,
        10 => Blob,
        _ => return Err(Error::Internal("bad property type tag".into())),
    })
}

fn encode_index(def: &IndexDef) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&def.property_id.to_ne_bytes());
    out.push(def.unique as u8);
    out
}

fn decode_index(id: IndexId, bytes: &[u8]) -> IndexDef {
    let property_id = PropertyId::from_ne_bytes(bytes[0..2].try_into().unwrap());
    let unique = bytes[2] != 0;
    IndexDef {
        id,
        property_id,
        unique,
    }
}

/// Handles to the catalog's four sub-stores, opened once per transaction.
#[derive(Debug, Clone, Copy)]
pub struct CatalogStores {
    pub dbinfo: StoreHandle,
    pub classes: StoreHandle,
    pub properties: StoreHandle,
    pub indexes: StoreHandle,
}

impl CatalogStores {
    pub fn open<T: KvTxn>(txn: &mut T) -> Result<Self> {
        Ok(CatalogStores {
            dbinfo: txn.open_store(STORE_DBINFO, StoreFlags::unique_bytes())?,
            classes: txn.open_store(STORE_CLASSES, StoreFlags::unique_numeric())?,
            properties: txn.open_store(STORE_PROPERTIES, StoreFlags::duplicate_bytes())?,
            indexes: txn.open_store(STORE_INDEXES, StoreFlags::unique_numeric())?,
        })
    }
}

fn get_counter<T: KvTxn>(txn: &T, stores: &CatalogStores, key: &str) -> Result<u64> {
    Ok(txn
        .get(stores.dbinfo, key.as_bytes())?
        .map(|v| u64::from_ne_bytes(v.try_into().unwrap()))
        .unwrap_or(0))
}

fn set_counter<T: KvTxn>(txn: &mut T, stores: &CatalogStores, key: &str, value: u64) -> Result<()> {
    txn.put(stores.dbinfo, key.as_bytes(), &value.to_ne_bytes())
}

/// The schema catalog, scoped to one write (or read) transaction.
pub struct Catalog {
    pub stores: CatalogStores,
}

impl Catalog {
    pub fn open<T: KvTxn>(txn: &mut T) -> Result<Self> {
        Ok(Catalog {
            stores: CatalogStores::open(txn)?,
        })
    }

    pub fn get_class<T: KvTxn>(&self, txn: &T, id: ClassId) -> Result<Option<ClassDef>> {
        match txn.get(self.stores.classes, &encode_u16_key(id))? {
            Some(bytes) => Ok(Some(decode_class(id, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn find_class_by_name<T: KvTxn>(&self, txn: &T, name: &str) -> Result<Option<ClassDef>> {
        for def in self.all_classes(txn)? {
            if def.name == name {
                return Ok(Some(def));
            }
        }
        Ok(None)
    }

    pub fn all_classes<T: KvTxn>(&self, txn: &T) -> Result<Vec<ClassDef>> {
        let mut out = Vec::new();
        let mut cursor = txn.cursor(self.stores.classes)?;
        let mut entry = cursor.find_range(&[])?;
        while let Some((key, val)) = entry {
            let id = u16::from_be_bytes(key[0..2].try_into().unwrap());
            out.push(decode_class(id, &val)?);
            entry = cursor.next()?;
        }
        Ok(out)
    }

    pub fn subclass_ids<T: KvTxn>(&self, txn: &T, super_id: ClassId) -> Result<Vec<ClassId>> {
        Ok(self
            .all_classes(txn)?
            .into_iter()
            .filter(|c| c.super_id == Some(super_id))
            .map(|c| c.id)
            .collect())
    }

    /// All ids in the inheritance chain rooted at `class_id` (itself included).
    pub fn subclass_closure<T: KvTxn>(&self, txn: &T, class_id: ClassId) -> Result<Vec<ClassId>> {
        let mut out = vec![class_id];
        let mut frontier = vec![class_id];
        while let Some(next) = frontier.pop() {
            for child in self.subclass_ids(txn, next)? {
                out.push(child);
                frontier.push(child);
            }
        }
        Ok(out)
    }

    /// Walks the properties owned by `class_id` and every ancestor, most
    /// specific (the class itself) first but deduplicated by name so each
    /// name appears once per the inheritance invariant.
    pub fn get_properties<T: KvTxn>(&self, txn: &T, class_id: ClassId) -> Result<Vec<PropertyDef>> {
        let mut seen_names = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut current = Some(class_id);
        while let Some(id) = current {
            for prop in self.properties_of_class(txn, id)? {
                if seen_names.insert(prop.name.clone()) {
                    out.push(prop);
                }
            }
            current = self
                .get_class(txn, id)?
                .and_then(|c| c.super_id);
        }
        Ok(out)
    }

    pub fn properties_of_class<T: KvTxn>(
        &self,
        txn: &T,
        class_id: ClassId,
    ) -> Result<Vec<PropertyDef>> {
        let mut out = Vec::new();
        let mut cursor = txn.cursor(self.stores.properties)?;
        let mut entry = cursor.find(&class_id.to_ne_bytes())?;
        while let Some((key, val)) = entry {
            if key != class_id.to_ne_bytes() {
                break;
            }
            out.push(decode_property(class_id, &val)?);
            entry = cursor.next()?;
        }
        Ok(out)
    }

    /// Map of property name -> type for a class, including inherited
    /// properties — the lookup table the filter engine evaluates against.
    pub fn property_type_map<T: KvTxn>(
        &self,
        txn: &T,
        class_id: ClassId,
    ) -> Result<HashMap<String, (PropertyId, PropertyType)>> {
        Ok(self
            .get_properties(txn, class_id)?
            .into_iter()
            .map(|p| (p.name, (p.id, p.property_type)))
            .collect())
    }

    pub fn get_index<T: KvTxn>(&self, txn: &T, id: IndexId) -> Result<Option<IndexDef>> {
        match txn.get(self.stores.indexes, &encode_u32_key(id))? {
            Some(bytes) => Ok(Some(decode_index(id, &bytes))),
            None => Ok(None),
        }
    }

    pub fn find_index_on_property<T: KvTxn>(
        &self,
        txn: &T,
        property_id: PropertyId,
    ) -> Result<Option<IndexDef>> {
        let mut cursor = txn.cursor(self.stores.indexes)?;
        let mut entry = cursor.find_range(&[])?;
        while let Some((key, val)) = entry {
            let id = u32::from_be_bytes(key[0..4].try_into().unwrap());
            let def = decode_index(id, &val);
            if def.property_id == property_id {
                return Ok(Some(def));
            }
            entry = cursor.next()?;
        }
        Ok(None)
    }

    // --- mutation: classes ---

    pub fn add_class<T: KvTxn>(
        &self,
        txn: &mut T,
        name: &str,
        class_type: ClassType,
        super_id: Option<ClassId>,
    ) -> Result<ClassDef> {
        if !nogdb_api::is_valid_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if self.find_class_by_name(txn, name)?.is_some() {
            return Err(Error::DuplicateClass(name.to_string()));
        }
        if let Some(sup_id) = super_id {
            let sup = self
                .get_class(txn, sup_id)?
                .ok_or_else(|| Error::UnknownClass(sup_id.to_string()))?;
            if sup.class_type != class_type {
                return Err(Error::InvalidClassType);
            }
        }

        let max_class_id = get_counter(txn, &self.stores, KEY_MAX_CLASS_ID)?;
        let next_id = max_class_id + 1;
        if next_id > MAX_CLASS_ID as u64 {
            return Err(Error::CounterUpperBound("MAXCLASS_REACH"));
        }
        let id = next_id as ClassId;

        let def = ClassDef {
            id,
            name: name.to_string(),
            class_type,
            super_id,
        };
        txn.put(self.stores.classes, &encode_u16_key(id), &encode_class(&def))?;
        set_counter(txn, &self.stores, KEY_MAX_CLASS_ID, next_id)?;
        let num = get_counter(txn, &self.stores, KEY_NUM_CLASS_ID)? + 1;
        set_counter(txn, &self.stores, KEY_NUM_CLASS_ID, num)?;
        Ok(def)
    }

    pub fn rename_class<T: KvTxn>(&self, txn: &mut T, id: ClassId, new_name: &str) -> Result<()> {
        if !nogdb_api::is_valid_name(new_name) {
            return Err(Error::InvalidName(new_name.to_string()));
        }
        if self.find_class_by_name(txn, new_name)?.is_some() {
            return Err(Error::DuplicateClass(new_name.to_string()));
        }
        let mut def = self
            .get_class(txn, id)?
            .ok_or_else(|| Error::UnknownClass(id.to_string()))?;
        def.name = new_name.to_string();
        txn.put(self.stores.classes, &encode_u16_key(id), &encode_class(&def))?;
        Ok(())
    }

    /// Removes the class entry, re-parenting subclasses to its superclass
    /// (or orphaning them if there is none). Properties/indexes/records/
    /// adjacency-entry cascades are the caller's responsibility (they span
    /// the data-record store and relation index, outside the catalog).
    pub fn drop_class<T: KvTxn>(&self, txn: &mut T, id: ClassId) -> Result<ClassDef> {
        let def = self
            .get_class(txn, id)?
            .ok_or_else(|| Error::UnknownClass(id.to_string()))?;
        for child_id in self.subclass_ids(txn, id)? {
            let mut child = self
                .get_class(txn, child_id)?
                .ok_or_else(|| Error::UnknownClass(child_id.to_string()))?;
            child.super_id = def.super_id;
            txn.put(
                self.stores.classes,
                &encode_u16_key(child_id),
                &encode_class(&child),
            )?;
        }
        txn.del(self.stores.classes, &encode_u16_key(id))?;
        Ok(def)
    }

    // --- mutation: properties ---

    pub fn add_property<T: KvTxn>(
        &self,
        txn: &mut T,
        class_id: ClassId,
        name: &str,
        property_type: PropertyType,
    ) -> Result<PropertyDef> {
        if !nogdb_api::is_valid_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        self.get_class(txn, class_id)?
            .ok_or_else(|| Error::UnknownClass(class_id.to_string()))?;

        // Name must be unique along the whole inheritance chain: check this
        // class's ancestors and every descendant.
        if self.get_properties(txn, class_id)?.iter().any(|p| p.name == name) {
            return Err(Error::DuplicateProperty(name.to_string()));
        }
        for descendant in self.subclass_closure(txn, class_id)? {
            if descendant == class_id {
                continue;
            }
            if self
                .properties_of_class(txn, descendant)?
                .iter()
                .any(|p| p.name == name)
            {
                return Err(Error::DuplicateProperty(name.to_string()));
            }
        }

        let max_property_id = get_counter(txn, &self.stores, KEY_MAX_PROPERTY_ID)?;
        let next_id = max_property_id + 1;
        if next_id > MAX_PROPERTY_ID as u64 {
            return Err(Error::CounterUpperBound("MAXPROPERTY_REACH"));
        }
        let id = next_id as PropertyId;

        let def = PropertyDef {
            id,
            owner_class_id: class_id,
            name: name.to_string(),
            property_type,
        };
        txn.put(
            self.stores.properties,
            &class_id.to_ne_bytes(),
            &encode_property(&def),
        )?;
        set_counter(txn, &self.stores, KEY_MAX_PROPERTY_ID, next_id)?;
        let num = get_counter(txn, &self.stores, KEY_NUM_PROPERTY_ID)? + 1;
        set_counter(txn, &self.stores, KEY_NUM_PROPERTY_ID, num)?;
        Ok(def)
    }

    pub fn rename_property<T: KvTxn>(
        &self,
        txn: &mut T,
        class_id: ClassId,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        if !nogdb_api::is_valid_name(new_name) {
            return Err(Error::InvalidName(new_name.to_string()));
        }
        let props = self.properties_of_class(txn, class_id)?;
        let def = props
            .into_iter()
            .find(|p| p.name == old_name)
            .ok_or_else(|| Error::UnknownProperty(old_name.to_string()))?;
        if self.get_properties(txn, class_id)?.iter().any(|p| p.name == new_name) {
            return Err(Error::DuplicateProperty(new_name.to_string()));
        }
        txn.del_exact(
            self.stores.properties,
            &class_id.to_ne_bytes(),
            &encode_property(&def),
        )?;
        let renamed = PropertyDef {
            name: new_name.to_string(),
            ..def
        };
        txn.put(
            self.stores.properties,
            &class_id.to_ne_bytes(),
            &encode_property(&renamed),
        )?;
        Ok(())
    }

    pub fn drop_property<T: KvTxn>(
        &self,
        txn: &mut T,
        class_id: ClassId,
        name: &str,
    ) -> Result<PropertyDef> {
        let props = self.properties_of_class(txn, class_id)?;
        let def = props
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;
        txn.del_exact(
            self.stores.properties,
            &class_id.to_ne_bytes(),
            &encode_property(&def),
        )?;
        Ok(def)
    }

    fn drop_properties_of_class<T: KvTxn>(&self, txn: &mut T, class_id: ClassId) -> Result<()> {
        for prop in self.properties_of_class(txn, class_id)? {
            txn.del_exact(
                self.stores.properties,
                &class_id.to_ne_bytes(),
                &encode_property(&prop),
            )?;
        }
        Ok(())
    }

    /// Drops every property owned by `class_id` and every index on those
    /// properties. Called by the higher-level `drop_class` orchestration in
    /// the facade crate, after data-record and adjacency cascades.
    pub fn drop_class_properties_and_indexes<T: KvTxn>(
        &self,
        txn: &mut T,
        class_id: ClassId,
    ) -> Result<()> {
        for prop in self.properties_of_class(txn, class_id)? {
            if let Some(index) = self.find_index_on_property(txn, prop.id)? {
                txn.del(self.stores.indexes, &encode_u32_key(index.id))?;
            }
        }
        self.drop_properties_of_class(txn, class_id)
    }

    // --- mutation: indexes ---

    pub fn add_index<T: KvTxn>(
        &self,
        txn: &mut T,
        property_id: PropertyId,
        unique: bool,
    ) -> Result<IndexDef> {
        if self.find_index_on_property(txn, property_id)?.is_some() {
            return Err(Error::DuplicateIndex);
        }
        let max_index_id = get_counter(txn, &self.stores, KEY_MAX_INDEX_ID)?;
        let next_id = max_index_id + 1;
        if next_id > MAX_INDEX_ID as u64 {
            return Err(Error::CounterUpperBound("MAXINDEX_REACH"));
        }
        let id = next_id as IndexId;
        let def = IndexDef {
            id,
            property_id,
            unique,
        };
        txn.put(self.stores.indexes, &encode_u32_key(id), &encode_index(&def))?;
        set_counter(txn, &self.stores, KEY_MAX_INDEX_ID, next_id)?;
        let num = get_counter(txn, &self.stores, KEY_NUM_INDEX_ID)? + 1;
        set_counter(txn, &self.stores, KEY_NUM_INDEX_ID, num)?;
        Ok(def)
    }

    pub fn drop_index<T: KvTxn>(&self, txn: &mut T, id: IndexId) -> Result<IndexDef> {
        let def = self
            .get_index(txn, id)?
            .ok_or(Error::InvalidAlterAttribute("no such index".into()))?;
        txn.del(self.stores.indexes, &encode_u32_key(id))?;
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Environment;
    use nogdb_api::{KvEngine, TxnMode};

    fn open_env() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();
        (dir, env)
    }

    #[test]
    fn add_and_fetch_class() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let def = catalog
            .add_class(&mut txn, "islands", ClassType::Vertex, None)
            .unwrap();
        assert_eq!(def.id, 1);
        let fetched = catalog.get_class(&txn, def.id).unwrap().unwrap();
        assert_eq!(fetched.name, "islands");
    }

    #[test]
    fn subclass_type_must_match_super() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let v = catalog
            .add_class(&mut txn, "vertex1", ClassType::Vertex, None)
            .unwrap();
        let err = catalog
            .add_class(&mut txn, "edge1", ClassType::Edge, Some(v.id))
            .unwrap_err();
        assert_eq!(err, Error::InvalidClassType);
    }

    #[test]
    fn properties_are_inherited_and_deduplicated() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let base = catalog
            .add_class(&mut txn, "vertex1", ClassType::Vertex, None)
            .unwrap();
        catalog
            .add_property(&mut txn, base.id, "prop0", PropertyType::UnsignedInteger)
            .unwrap();
        let sub = catalog
            .add_class(&mut txn, "vertex3", ClassType::Vertex, Some(base.id))
            .unwrap();
        catalog
            .add_property(&mut txn, sub.id, "prop3", PropertyType::Real)
            .unwrap();

        let props = catalog.get_properties(&txn, sub.id).unwrap();
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"prop0"));
        assert!(names.contains(&"prop3"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn duplicate_property_name_along_chain_is_rejected() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let base = catalog
            .add_class(&mut txn, "vertex1", ClassType::Vertex, None)
            .unwrap();
        catalog
            .add_property(&mut txn, base.id, "name", PropertyType::Text)
            .unwrap();
        let sub = catalog
            .add_class(&mut txn, "vertex2", ClassType::Vertex, Some(base.id))
            .unwrap();
        let err = catalog
            .add_property(&mut txn, sub.id, "name", PropertyType::Text)
            .unwrap_err();
        assert_eq!(err, Error::DuplicateProperty("name".into()));
    }

    #[test]
    fn drop_class_reparents_subclasses() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let root = catalog
            .add_class(&mut txn, "vertex1", ClassType::Vertex, None)
            .unwrap();
        let mid = catalog
            .add_class(&mut txn, "vertex2", ClassType::Vertex, Some(root.id))
            .unwrap();
        let leaf = catalog
            .add_class(&mut txn, "vertex3", ClassType::Vertex, Some(mid.id))
            .unwrap();

        catalog.drop_class(&mut txn, mid.id).unwrap();
        let leaf_after = catalog.get_class(&txn, leaf.id).unwrap().unwrap();
        assert_eq!(leaf_after.super_id, Some(root.id));
    }
}
