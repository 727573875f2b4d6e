use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use sled::{Db, IVec, Tree};
use tokio::task;

use crate::features::prendas::dto::{ID_FIELD, Prenda, SearchField};
use crate::features::prendas::helpers::compile_pattern;
use crate::features::prendas::store::{ConnectionProvider, PrendaConnection, StoreError};

/// Embedded backend. The `Db` is opened once by the caller because sled locks its
/// directory per process; each connection is a handle on the collection tree.
///
/// Documents live in the collection tree under big-endian generated keys. A second
/// `<collection>_ids` tree maps each encoded `_id` to its document key and keeps `_id`
/// unique.
pub struct SledConnectionProvider {
    db: Db,
    collection: String,
}

impl SledConnectionProvider {
    pub fn new(db: Db, collection: impl Into<String>) -> Self {
        Self {
            db,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for SledConnectionProvider {
    async fn connect(&self) -> Result<Arc<dyn PrendaConnection>, StoreError> {
        let db = self.db.clone();
        let collection = self.collection.clone();
        let (tree, ids) = task::spawn_blocking(move || -> sled::Result<(Tree, Tree)> {
            let tree = db.open_tree(&collection)?;
            let ids = db.open_tree(format!("{collection}_ids"))?;
            Ok((tree, ids))
        })
        .await
        .map_err(|err| StoreError::connection(format!("sled task join error: {err}")))?
        .map_err(|err| StoreError::connection(format!("failed to open tree: {err}")))?;

        Ok(Arc::new(SledConnection {
            db: self.db.clone(),
            tree,
            ids,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

struct SledConnection {
    db: Db,
    tree: Tree,
    ids: Tree,
}

struct StoredEntry {
    key: IVec,
    raw: IVec,
    prenda: Prenda,
}

impl SledConnection {
    async fn with_trees<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Db, &Tree, &Tree) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        let tree = self.tree.clone();
        let ids = self.ids.clone();
        task::spawn_blocking(move || operation(&db, &tree, &ids))
            .await
            .map_err(|err| StoreError::query(format!("sled task join error: {err}")))?
    }
}

#[async_trait]
impl PrendaConnection for SledConnection {
    async fn find_all(&self) -> Result<Vec<Prenda>, StoreError> {
        self.with_trees(|_, tree, _| Ok(scan(tree)?.into_iter().map(|entry| entry.prenda).collect()))
            .await
    }

    async fn find_by_codigo(&self, codigo: i64) -> Result<Option<Prenda>, StoreError> {
        self.with_trees(move |_, tree, _| Ok(find_entry(tree, codigo)?.map(|entry| entry.prenda)))
            .await
    }

    async fn find_matching(
        &self,
        field: SearchField,
        pattern: &str,
    ) -> Result<Vec<Prenda>, StoreError> {
        let regex = compile_pattern(pattern)
            .map_err(|err| StoreError::invalid_pattern(pattern, err.to_string()))?;

        self.with_trees(move |_, tree, _| {
            Ok(scan(tree)?
                .into_iter()
                .map(|entry| entry.prenda)
                .filter(|prenda| field_matches(prenda.get(field.as_str()), &regex))
                .collect())
        })
        .await
    }

    async fn insert_one(&self, prenda: &Prenda) -> Result<(), StoreError> {
        let mut stored = prenda.clone();
        self.with_trees(move |db, tree, ids| {
            let id = db
                .generate_id()
                .map_err(|err| StoreError::query(format!("failed to generate id: {err}")))?;
            if stored.get(ID_FIELD).is_none() {
                stored.insert(ID_FIELD, Value::String(format!("{id:024x}")));
            }

            let key = id.to_be_bytes();
            let id_key = id_index_key(&stored)?;
            let claimed = ids
                .compare_and_swap(&id_key, None::<&[u8]>, Some(&key[..]))
                .map_err(|err| StoreError::query(format!("failed to index _id: {err}")))?;
            if claimed.is_err() {
                return Err(StoreError::query(format!(
                    "duplicate key: _id {}",
                    String::from_utf8_lossy(&id_key)
                )));
            }

            let bytes = encode(&stored)?;
            if let Err(err) = tree.insert(key, bytes) {
                let _ = ids.remove(&id_key);
                return Err(StoreError::query(format!("failed to write document: {err}")));
            }
            Ok(())
        })
        .await
    }

    /// The merge is swapped in against the exact bytes it was computed from; a concurrent
    /// writer makes the swap fail and the merge is redone on the newer document.
    async fn update_one(&self, codigo: i64, patch: &Prenda) -> Result<u64, StoreError> {
        let patch = patch.clone();
        self.with_trees(move |_, tree, _| {
            loop {
                let Some(entry) = find_entry(tree, codigo)? else {
                    return Ok(0);
                };

                let mut stored = entry.prenda;
                if let Some(new_id) = patch.get(ID_FIELD) {
                    if stored.get(ID_FIELD) != Some(new_id) {
                        return Err(StoreError::query("the _id field is immutable"));
                    }
                }
                stored.merge(&patch);

                let swapped = tree
                    .compare_and_swap(&entry.key, Some(&entry.raw), Some(encode(&stored)?))
                    .map_err(|err| StoreError::query(format!("failed to write document: {err}")))?;
                if swapped.is_ok() {
                    return Ok(1);
                }
            }
        })
        .await
    }

    async fn delete_one(&self, codigo: i64) -> Result<u64, StoreError> {
        self.with_trees(move |_, tree, ids| {
            loop {
                let Some(entry) = find_entry(tree, codigo)? else {
                    return Ok(0);
                };

                let swapped = tree
                    .compare_and_swap(&entry.key, Some(&entry.raw), None::<IVec>)
                    .map_err(|err| {
                        StoreError::query(format!("failed to remove document: {err}"))
                    })?;
                if swapped.is_err() {
                    continue;
                }

                let id_key = id_index_key(&entry.prenda)?;
                // A failed swap means the _id already points elsewhere; leave it alone.
                let _ = ids
                    .compare_and_swap(&id_key, Some(&entry.key), None::<IVec>)
                    .map_err(|err| StoreError::query(format!("failed to release _id: {err}")))?;
                return Ok(1);
            }
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.tree
            .flush_async()
            .await
            .map(|_| ())
            .map_err(|err| StoreError::connection(format!("failed to flush tree: {err}")))
    }
}

fn scan(tree: &Tree) -> Result<Vec<StoredEntry>, StoreError> {
    tree.iter()
        .map(|entry| {
            let (key, raw) =
                entry.map_err(|err| StoreError::query(format!("failed to read tree: {err}")))?;
            let prenda = serde_json::from_slice::<Prenda>(&raw)
                .map_err(|err| StoreError::codec(format!("failed to decode document: {err}")))?;
            Ok(StoredEntry { key, raw, prenda })
        })
        .collect()
}

fn find_entry(tree: &Tree, codigo: i64) -> Result<Option<StoredEntry>, StoreError> {
    Ok(scan(tree)?
        .into_iter()
        .find(|entry| entry.prenda.has_codigo(codigo)))
}

fn encode(prenda: &Prenda) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(prenda)
        .map_err(|err| StoreError::codec(format!("failed to encode document: {err}")))
}

/// JSON encoding of `_id`, so the string `"1"` and the number `1` stay distinct.
fn id_index_key(prenda: &Prenda) -> Result<Vec<u8>, StoreError> {
    let id = prenda.get(ID_FIELD).unwrap_or(&Value::Null);
    serde_json::to_vec(id).map_err(|err| StoreError::codec(format!("failed to encode _id: {err}")))
}

/// Strings match directly; arrays match when any string element does.
fn field_matches(value: Option<&Value>, regex: &Regex) -> bool {
    match value {
        Some(Value::String(text)) => regex.is_match(text),
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| item.as_str().is_some_and(|text| regex.is_match(text))),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prenda(value: Value) -> Prenda {
        serde_json::from_value(value).expect("object")
    }

    fn provider() -> (tempfile::TempDir, SledConnectionProvider) {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let db = sled::open(temp_dir.path()).expect("sled open");
        (temp_dir, SledConnectionProvider::new(db, "prendas"))
    }

    #[tokio::test]
    async fn insert_assigns_hex_id_and_keeps_insertion_order() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");

        connection
            .insert_one(&prenda(json!({"codigo": 1, "nombre": "Camisa"})))
            .await
            .expect("insert");
        connection
            .insert_one(&prenda(json!({"codigo": 2, "nombre": "Pantalon", "_id": "propio"})))
            .await
            .expect("insert");

        let all = connection.find_all().await.expect("find all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].codigo(), Some(1));
        let generated = all[0].get(ID_FIELD).and_then(Value::as_str).expect("id");
        assert_eq!(generated.len(), 24);
        assert_eq!(all[1].get(ID_FIELD), Some(&json!("propio")));

        connection.disconnect().await.expect("disconnect");
    }

    #[tokio::test]
    async fn matches_strings_and_string_arrays() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");

        connection
            .insert_one(&prenda(json!({"codigo": 1, "categoria": ["Ropa", "Verano"]})))
            .await
            .expect("insert");
        connection
            .insert_one(&prenda(json!({"codigo": 2, "categoria": "Calzado"})))
            .await
            .expect("insert");
        connection
            .insert_one(&prenda(json!({"codigo": 3, "categoria": 42})))
            .await
            .expect("insert");

        let verano = connection
            .find_matching(SearchField::Categoria, "VERANO")
            .await
            .expect("search");
        assert_eq!(verano.len(), 1);
        assert_eq!(verano[0].codigo(), Some(1));

        let anchored = connection
            .find_matching(SearchField::Categoria, "^cal")
            .await
            .expect("search");
        assert_eq!(anchored.len(), 1);
        assert_eq!(anchored[0].codigo(), Some(2));
    }

    #[tokio::test]
    async fn update_refuses_to_change_id() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");
        connection
            .insert_one(&prenda(json!({"codigo": 9, "_id": "original"})))
            .await
            .expect("insert");

        let result = connection
            .update_one(9, &prenda(json!({"_id": "otro"})))
            .await;
        assert!(matches!(result, Err(StoreError::Query(_))));

        let same = connection
            .update_one(9, &prenda(json!({"_id": "original", "precio": 10})))
            .await
            .expect("update");
        assert_eq!(same, 1);
    }

    #[tokio::test]
    async fn update_and_delete_touch_only_the_first_match() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");
        for nombre in ["Primera", "Segunda"] {
            connection
                .insert_one(&prenda(json!({"codigo": 4, "nombre": nombre})))
                .await
                .expect("insert");
        }

        assert_eq!(
            connection
                .update_one(4, &prenda(json!({"precio": 50})))
                .await
                .expect("update"),
            1
        );
        let all = connection.find_all().await.expect("find all");
        assert_eq!(all[0].get("precio"), Some(&json!(50)));
        assert_eq!(all[1].get("precio"), None);

        assert_eq!(connection.delete_one(4).await.expect("delete"), 1);
        let remaining = connection.find_by_codigo(4).await.expect("find");
        assert_eq!(remaining.as_ref().and_then(Prenda::nombre), Some("Segunda"));

        let missing = connection
            .update_one(77, &prenda(json!({"a": 1})))
            .await
            .expect("update");
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");

        connection
            .insert_one(&prenda(json!({"_id": "a", "codigo": 1})))
            .await
            .expect("first insert");
        let second = connection
            .insert_one(&prenda(json!({"_id": "a", "codigo": 2})))
            .await;
        assert!(matches!(second, Err(StoreError::Query(_))));

        connection
            .insert_one(&prenda(json!({"_id": 1, "codigo": 3})))
            .await
            .expect("numeric _id is a different key");
        assert_eq!(connection.find_all().await.expect("find all").len(), 2);
    }

    #[tokio::test]
    async fn deleted_ids_can_be_reused() {
        let (_dir, provider) = provider();
        let connection = provider.connect().await.expect("connect");

        connection
            .insert_one(&prenda(json!({"_id": "b", "codigo": 1})))
            .await
            .expect("insert");
        assert_eq!(connection.delete_one(1).await.expect("delete"), 1);

        connection
            .insert_one(&prenda(json!({"_id": "b", "codigo": 2})))
            .await
            .expect("reinsert");
        assert!(connection.find_by_codigo(2).await.expect("find").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_patches_to_one_document_keep_every_field() {
        let (_dir, provider) = provider();
        let provider = Arc::new(provider);
        {
            let connection = provider.connect().await.expect("connect");
            for codigo in 0..200 {
                connection
                    .insert_one(&prenda(json!({"codigo": codigo})))
                    .await
                    .expect("seed");
            }
        }

        let mut tasks = Vec::new();
        for i in 0..32 {
            let provider = provider.clone();
            tasks.push(tokio::spawn(async move {
                let connection = provider.connect().await.expect("connect");
                let patch = prenda(json!({ format!("f{i}"): i }));
                connection.update_one(199, &patch).await.expect("update")
            }));
        }
        for task in tasks {
            assert_eq!(task.await.expect("join"), 1);
        }

        let connection = provider.connect().await.expect("connect");
        let stored = connection
            .find_by_codigo(199)
            .await
            .expect("find")
            .expect("present");
        for i in 0..32 {
            assert_eq!(stored.get(&format!("f{i}")), Some(&json!(i)), "f{i}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_with_one_id_store_a_single_document() {
        let (_dir, provider) = provider();
        let provider = Arc::new(provider);

        let mut tasks = Vec::new();
        for codigo in 0..8 {
            let provider = provider.clone();
            tasks.push(tokio::spawn(async move {
                let connection = provider.connect().await.expect("connect");
                connection
                    .insert_one(&prenda(json!({"_id": "same", "codigo": codigo})))
                    .await
                    .is_ok()
            }));
        }

        let mut stored = 0;
        for task in tasks {
            if task.await.expect("join") {
                stored += 1;
            }
        }
        assert_eq!(stored, 1);

        let connection = provider.connect().await.expect("connect");
        assert_eq!(connection.find_all().await.expect("find all").len(), 1);
    }
}
