//! Per-request context attachment.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use domain::RequestContext;
use persistence::Store;

use crate::state::AppState;

/// Attaches a [`RequestContext`] with the configured deadline to the request.
///
/// If the client disconnects, hyper drops this future; the drop guard then
/// cancels the context and any storage call still in flight is abandoned.
pub async fn request_context<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::with_timeout(state.request_timeout);
    let guard = ctx.cancellation_token().clone().drop_guard();
    req.extensions_mut().insert(ctx);

    let response = next.run(req).await;
    guard.disarm();
    response
}
