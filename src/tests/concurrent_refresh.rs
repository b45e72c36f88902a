#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, routing::get, routing::post, Json, Router};
    use chrono::{TimeDelta, Utc};
    use serde_json::{json, Value};

    use crate::auth::claims::parse_claims;
    use crate::auth::store::{MemoryTokenStore, TokenStore};
    use crate::client::ApiClient;
    use crate::tests::common::{build_reqwest_client, sample_token, spawn_axum};

    async fn refresh(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        Json(json!({ "token": sample_token(&format!("refresh-{}", n), Utc::now().timestamp() + 3600) }))
    }

    async fn hits(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
        Json(json!({ "hits": hits.load(Ordering::SeqCst) }))
    }

    #[tokio::test]
    async fn racing_refreshes_leave_one_consistent_token() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/hits", get(hits))
            .with_state(counter);
        let (handle, addr) = spawn_axum(router).await;

        let store = Arc::new(MemoryTokenStore::new(&sample_token("stale", Utc::now().timestamp() - 5)));
        let client = ApiClient::new(&format!("http://{}", addr), store.clone()).unwrap();

        // both callers see the stale token before either refresh lands
        let (a, b) = tokio::join!(client.ensure_valid(), client.ensure_valid());
        a.unwrap();
        b.unwrap();

        let body: Value = build_reqwest_client()
            .get(format!("http://{}/hits", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["hits"], 2);

        let credentials = client.session().credentials().await;
        let token = credentials.token().unwrap();
        let claims = credentials.claims().unwrap();
        assert!(claims.subject.starts_with("refresh-"));
        assert_eq!(parse_claims(token).unwrap().subject, claims.subject);
        assert!(!credentials.is_expired(Utc::now(), TimeDelta::minutes(5)));
        // the store ends on the same token the session holds
        assert_eq!(store.load(), token);

        // fresh now, so no third refresh
        client.ensure_valid().await.unwrap();
        let body: Value = build_reqwest_client()
            .get(format!("http://{}/hits", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["hits"], 2);

        handle.abort();
    }
}
