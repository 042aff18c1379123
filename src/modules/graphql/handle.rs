use actix_web::{web, HttpRequest, HttpResponse};
use async_graphql::Data;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};

use super::schema::{viewer_from_init, AppSchema};
use super::types::Viewer;
use crate::{api::error, middlewares::get_claims, ENV};

/// Queries and mutations; the JWT middleware has already run.
pub async fn graphql_handler(
    schema: web::Data<AppSchema>,
    req: HttpRequest,
    gql_request: GraphQLRequest,
) -> Result<GraphQLResponse, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let request = gql_request.into_inner().data(Viewer(user_id));
    Ok(schema.execute(request).await.into())
}

/// Subscriptions over graphql-ws, authenticated by the `connection_init` payload.
pub async fn graphql_ws_handler(
    schema: web::Data<AppSchema>,
    req: HttpRequest,
    payload: web::Payload,
) -> actix_web::Result<HttpResponse> {
    let secret = ENV.jwt_secret.clone();

    GraphQLSubscription::new(schema.get_ref().clone())
        .on_connection_init(move |value| async move {
            let viewer = viewer_from_init(&value, secret.as_bytes())?;
            tracing::debug!("GraphQL subscription connection for user {}", viewer.0);

            let mut data = Data::default();
            data.insert(viewer);
            Ok(data)
        })
        .start(&req, payload)
}
