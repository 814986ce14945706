//! `DocumentStore` backed by the host page's store glue.
//!
//! Contract (see `crate::bridge`): `window.studydeskCloud.store` exposes
//!
//! ```text
//! watch(collection, uid, orderBy, descending, onDocs, onError) -> unsubscribe()
//! create(collection, uid, fieldsJson) -> Promise<docId>
//! merge(collection, uid, docId, patchJson) -> Promise<void>
//! remove(collection, uid, docId) -> Promise<void>
//! ```
//!
//! `onDocs` receives an array of `{id, data}` objects, already ordered by the
//! collection's subscription key.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::bridge::{bridge_fn, bridge_section, call_promise, js_error_message, json_value};

use super::{
    Collection, DocumentStore, SnapshotCallback, StoreDoc, StoreError, StoreResult, WatchHandle,
};

const STORE_SECTION: &str = "store";

#[derive(Clone, Copy, Default)]
pub(crate) struct BridgeStore;

impl BridgeStore {
    pub fn new() -> Self {
        Self
    }
}

/// Decode a snapshot payload: an array of `{id, data}` entries. Entries
/// without a usable id are skipped rather than failing the snapshot.
pub(crate) fn docs_from_value(v: &Value) -> StoreResult<Vec<StoreDoc>> {
    let entries = v
        .as_array()
        .ok_or_else(|| StoreError::parse("snapshot payload is not an array"))?;

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry
            .get("id")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_string();
        if id.trim().is_empty() {
            continue;
        }
        let fields = entry.get("data").cloned().unwrap_or(Value::Null);
        out.push(StoreDoc { id, fields });
    }
    Ok(out)
}

fn store_fn(name: &str) -> StoreResult<(js_sys::Object, js_sys::Function)> {
    let section = bridge_section(STORE_SECTION).map_err(StoreError::bridge)?;
    let f = bridge_fn(&section, name).map_err(StoreError::bridge)?;
    Ok((section, f))
}

impl DocumentStore for BridgeStore {
    fn watch(
        &self,
        user_id: &str,
        collection: Collection,
        on_snapshot: SnapshotCallback,
    ) -> WatchHandle {
        let (section, watch) = match store_fn("watch") {
            Ok(pair) => pair,
            Err(e) => {
                on_snapshot(Err(e));
                return WatchHandle::dead();
            }
        };

        let docs_cb = {
            let on_snapshot = on_snapshot.clone();
            Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
                let result = json_value(&payload)
                    .map_err(StoreError::parse)
                    .and_then(|v| docs_from_value(&v));
                on_snapshot(result);
            })
        };

        let err_cb = Closure::<dyn Fn(JsValue)>::new(move |err: JsValue| {
            on_snapshot(Err(StoreError::backend(js_error_message(&err))));
        });

        let (order_by, descending) = collection.order();
        let args = js_sys::Array::new();
        args.push(&collection.to_string().into());
        args.push(&user_id.into());
        args.push(&order_by.into());
        args.push(&descending.into());
        args.push(docs_cb.as_ref().unchecked_ref());
        args.push(err_cb.as_ref().unchecked_ref());

        let unsub = match watch.apply(&section, &args) {
            Ok(v) => v.dyn_into::<js_sys::Function>().ok(),
            Err(_) => None,
        };

        // The JS closures must outlive the subscription; tie their lifetime to
        // the handle.
        WatchHandle::new(move || {
            if let Some(unsub) = &unsub {
                let _ = unsub.call0(&JsValue::NULL);
            }
            drop(docs_cb);
            drop(err_cb);
        })
    }

    fn create(
        &self,
        user_id: &str,
        collection: Collection,
        fields: Value,
    ) -> LocalBoxFuture<'static, StoreResult<String>> {
        let user_id = user_id.to_string();
        async move {
            let (section, f) = store_fn("create")?;
            let result = call_promise(
                &f,
                &section,
                &[
                    collection.to_string().into(),
                    user_id.into(),
                    fields.to_string().into(),
                ],
            )
            .await
            .map_err(StoreError::backend)?;

            result
                .as_string()
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| StoreError::parse("create did not return a document id"))
        }
        .boxed_local()
    }

    fn merge(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
        patch: Value,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let user_id = user_id.to_string();
        let doc_id = doc_id.to_string();
        async move {
            let (section, f) = store_fn("merge")?;
            call_promise(
                &f,
                &section,
                &[
                    collection.to_string().into(),
                    user_id.into(),
                    doc_id.into(),
                    patch.to_string().into(),
                ],
            )
            .await
            .map_err(StoreError::backend)?;
            Ok(())
        }
        .boxed_local()
    }

    fn remove(
        &self,
        user_id: &str,
        collection: Collection,
        doc_id: &str,
    ) -> LocalBoxFuture<'static, StoreResult<()>> {
        let user_id = user_id.to_string();
        let doc_id = doc_id.to_string();
        async move {
            let (section, f) = store_fn("remove")?;
            call_promise(
                &f,
                &section,
                &[collection.to_string().into(), user_id.into(), doc_id.into()],
            )
            .await
            .map_err(StoreError::backend)?;
            Ok(())
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docs_from_value_skips_blank_ids() {
        let payload = serde_json::json!([
            { "id": "a", "data": { "title": "A" } },
            { "id": "", "data": { "title": "dropped" } },
            { "data": { "title": "also dropped" } },
            { "id": "b" },
        ]);
        let docs = docs_from_value(&payload).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].fields["title"], "A");
        assert_eq!(docs[1].id, "b");
        assert_eq!(docs[1].fields, serde_json::Value::Null);
    }

    #[test]
    fn docs_from_value_rejects_non_array() {
        let err = docs_from_value(&serde_json::json!({ "id": "a" })).unwrap_err();
        assert_eq!(err.kind, super::super::StoreErrorKind::Parse);
    }
}
