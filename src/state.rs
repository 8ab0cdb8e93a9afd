use std::sync::Arc;

use crate::assistant::Assistant;
use crate::auth::events::AuthEvents;
use crate::backend::Backend;
use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    /// Unscoped client; handlers scope it per caller.
    pub backend: Backend,
    pub config: Config,
    pub assistant: Arc<dyn Assistant>,
    pub auth_events: AuthEvents,
    pub login_limiter: LoginRateLimiter,
}
