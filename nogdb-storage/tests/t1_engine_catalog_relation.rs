use nogdb_api::{ClassType, KvEngine, KvTxn, PropertyType, TxnMode};
use nogdb_storage::catalog::Catalog;
use nogdb_storage::relation::{self, RelationStores};
use nogdb_storage::Environment;

#[test]
fn t1_catalog_and_relations_survive_commit_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path()).unwrap();

    let (class_id, prop_id) = {
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let catalog = Catalog::open(&mut txn).unwrap();
        let class = catalog
            .add_class(&mut txn, "island", ClassType::Vertex, None)
            .unwrap();
        let prop = catalog
            .add_property(&mut txn, class.id, "name", PropertyType::Text)
            .unwrap();
        txn.commit().unwrap();
        (class.id, prop.id)
    };

    drop(env);
    let env = Environment::open(dir.path()).unwrap();
    let mut txn = env.begin(TxnMode::ReadOnly).unwrap();
    let catalog = Catalog::open(&mut txn).unwrap();
    let class = catalog.get_class(&mut txn, class_id).unwrap().unwrap();
    assert_eq!(class.name, "island");
    let props = catalog.get_properties(&mut txn, class_id).unwrap();
    assert!(props.iter().any(|p| p.id == prop_id && p.name == "name"));
}

#[test]
fn t2_reader_begun_before_commit_does_not_observe_new_class() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path()).unwrap();

    let reader = env.begin(TxnMode::ReadOnly).unwrap();

    let mut writer = env.begin(TxnMode::ReadWrite).unwrap();
    let catalog = Catalog::open(&mut writer).unwrap();
    catalog
        .add_class(&mut writer, "island", ClassType::Vertex, None)
        .unwrap();
    writer.commit().unwrap();

    let mut reader = reader;
    let reader_catalog = Catalog::open(&mut reader).unwrap();
    assert!(reader_catalog
        .find_class_by_name(&mut reader, "island")
        .unwrap()
        .is_none());
}

#[test]
fn t3_relation_index_removal_cascades_both_directions() {
    use nogdb_api::RecordId;

    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path()).unwrap();
    let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
    let relations = RelationStores::open(&mut txn).unwrap();

    let v1 = RecordId::new(1, 1);
    let v2 = RecordId::new(1, 2);
    let e1 = RecordId::new(2, 1);

    relation::add_relation(&mut txn, &relations, e1, v1, v2).unwrap();
    assert_eq!(relation::out_edges(&mut txn, &relations, v1).unwrap().len(), 1);
    assert_eq!(relation::in_edges(&mut txn, &relations, v2).unwrap().len(), 1);

    let removed = relation::remove_all_incident(&mut txn, &relations, v1).unwrap();
    assert_eq!(removed, vec![e1]);
    assert!(relation::out_edges(&mut txn, &relations, v1).unwrap().is_empty());
    assert!(relation::in_edges(&mut txn, &relations, v2).unwrap().is_empty());
    txn.commit().unwrap();
}
