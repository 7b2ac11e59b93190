//! Application startup.
//!
//! SYSTEM CONTEXT
//! ==============
//! Order matters: the navigator is built with the guard installed, the
//! session is initialized and awaited, the first navigation runs, and only
//! then is the UI mounted. A failed initialization is logged and the app
//! starts signed out.

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod bootstrap_test;

use std::rc::Rc;

use crate::config::ClientConfig;
use crate::net::admin::AdminApi;
use crate::router::navigator::Navigator;
use crate::router::routes::RouteTable;
use crate::state::session::SessionManager;

/// Handles a mounted UI works with.
#[derive(Clone)]
pub struct App {
    pub session: SessionManager,
    pub navigator: Rc<Navigator>,
    pub admin: AdminApi,
}

/// Initialize the session, perform the first navigation to `initial_path`,
/// then call `mount`.
pub async fn bootstrap(
    session: SessionManager,
    routes: Rc<RouteTable>,
    config: &ClientConfig,
    initial_path: &str,
    mount: impl FnOnce(&App),
) -> App {
    let navigator = Rc::new(Navigator::new(session.clone(), routes, config));

    if let Err(err) = session.init().await {
        tracing::error!(error = %err, "session initialization failed; starting signed out");
    }

    match navigator.navigate(initial_path).await {
        Ok(outcome) => tracing::debug!(?outcome, "initial navigation"),
        Err(err) => tracing::error!(error = %err, path = initial_path, "initial navigation failed"),
    }

    let app = App { admin: AdminApi::new(session.clone()), session, navigator };
    mount(&app);
    tracing::info!(authenticated = app.session.is_authenticated(), "app mounted");
    app
}

#[cfg(feature = "hydrate")]
pub use browser::start_browser;

#[cfg(feature = "hydrate")]
mod browser {
    use std::rc::Rc;

    use super::{App, bootstrap};
    use crate::config::ClientConfig;
    use crate::net::transport::GlooTransport;
    use crate::router::routes::RouteTable;
    use crate::state::session::SessionManager;
    use crate::state::storage::{LocalStorage, MemoryStorage, StorageBackend};
    use crate::state::token_store::TokenStore;

    /// Browser entry point: panic hook, console logging, `localStorage`,
    /// `fetch` transport, then [`bootstrap`] at the current URL.
    pub fn start_browser(mount: impl FnOnce(&App) + 'static) {
        console_error_panic_hook::set_once();
        _ = console_log::init_with_level(log::Level::Debug);

        let config = ClientConfig::default();
        let storage: Rc<dyn StorageBackend> = match LocalStorage::open() {
            Ok(storage) => Rc::new(storage),
            Err(err) => {
                tracing::warn!(error = %err, "localStorage unavailable; session will not survive reloads");
                Rc::new(MemoryStorage::default())
            }
        };
        let session = SessionManager::new(&config, Rc::new(GlooTransport), TokenStore::new(storage));
        let path = current_path();

        wasm_bindgen_futures::spawn_local(async move {
            bootstrap(session, Rc::new(RouteTable::portal()), &config, &path, mount).await;
        });
    }

    fn current_path() -> String {
        let Some(location) = web_sys::window().map(|w| w.location()) else {
            return "/".to_owned();
        };
        let path = location.pathname().unwrap_or_else(|_| "/".to_owned());
        let query = location.search().unwrap_or_default();
        format!("{path}{query}")
    }
}
