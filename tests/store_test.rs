use serde_json::json;

use strata::query::{Filter, OrderBy, SelectQuery};
use strata::store::sqlite::SqliteStore;
use strata::store::{Backend, Datapoint, datapoints_table};

fn scoped_query(store: &SqliteStore, dataset_name: &str) -> SelectQuery {
    let dataset = store.dataset(dataset_name).unwrap().unwrap();
    let mut query = SelectQuery::table(datapoints_table());
    query.base_filters = vec![Filter::eq("dataset_id", dataset.id.to_string()).unwrap()];
    query
}

#[tokio::test]
async fn inserted_records_round_trip_through_select() {
    let store = SqliteStore::in_memory().unwrap();
    let dataset = store.create_dataset("evals").unwrap();

    let raw = json!({
        "data": {"question": "2+2?"},
        "target": "4",
        "metadata": {"source": "arithmetic"}
    });
    store.insert_datapoints(dataset.id, &[raw]).unwrap();

    let rows = store.select(&scoped_query(&store, "evals")).await.unwrap();
    assert_eq!(rows.len(), 1);

    let dp = Datapoint::from_row(&rows[0]).unwrap();
    assert_eq!(dp.dataset_id, dataset.id);
    assert_eq!(dp.data, json!({"question": "2+2?"}));
    assert_eq!(dp.target, Some(json!("4")));
    assert_eq!(dp.metadata.get("source"), Some(&json!("arithmetic")));
}

#[tokio::test]
async fn count_matches_select_and_exists_agrees() {
    let store = SqliteStore::in_memory().unwrap();
    let dataset = store.create_dataset("evals").unwrap();
    store.create_dataset("untouched").unwrap();

    let records: Vec<_> = (0..7).map(|i| json!({"data": {"n": i}})).collect();
    store.insert_datapoints(dataset.id, &records).unwrap();

    let query = scoped_query(&store, "evals");
    assert_eq!(store.count(&query).await.unwrap(), 7);
    assert_eq!(store.select(&query).await.unwrap().len(), 7);
    assert!(
        store
            .exists(&datapoints_table(), &query.base_filters)
            .await
            .unwrap()
    );

    let other = scoped_query(&store, "untouched");
    assert_eq!(store.count(&other).await.unwrap(), 0);
    assert!(
        !store
            .exists(&datapoints_table(), &other.base_filters)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn count_ignores_order_and_paging() {
    let store = SqliteStore::in_memory().unwrap();
    let dataset = store.create_dataset("evals").unwrap();
    let records: Vec<_> = (0..5).map(|i| json!({"data": {"n": i}})).collect();
    store.insert_datapoints(dataset.id, &records).unwrap();

    let mut query = scoped_query(&store, "evals");
    query.order_by = Some(OrderBy::desc("data").unwrap());
    query.limit = Some(2);
    query.offset = Some(2);

    assert_eq!(store.select(&query).await.unwrap().len(), 2);
    assert_eq!(store.count(&query).await.unwrap(), 5);
}

#[tokio::test]
async fn additional_filters_narrow_within_the_scope() {
    let store = SqliteStore::in_memory().unwrap();
    let a = store.create_dataset("a").unwrap();
    let b = store.create_dataset("b").unwrap();

    store
        .insert_datapoints(a.id, &[json!({"data": "needle"}), json!({"data": "hay"})])
        .unwrap();
    store
        .insert_datapoints(b.id, &[json!({"data": "needle"})])
        .unwrap();

    let mut query = scoped_query(&store, "a");
    query.filters = vec![Filter::like("data", "%needle%").unwrap()];

    // Only dataset a's needle, never b's.
    assert_eq!(store.count(&query).await.unwrap(), 1);
    let rows = store.select(&query).await.unwrap();
    let dp = Datapoint::from_row(&rows[0]).unwrap();
    assert_eq!(dp.dataset_id, a.id);
}
