//! Identity capability.
//!
//! Sign-in/sign-out and the live "current user or none" value are delegated
//! to an external identity provider through the host page's auth glue
//! (`window.studydeskCloud.auth`):
//!
//! ```text
//! signInPopup() -> Promise<user>
//! signInRedirect() -> Promise<void>   // result collected on next load
//! signOut() -> Promise<void>
//! onAuthStateChanged(cb) -> unsubscribe()
//! ```
//!
//! The only fallback policy is popup -> redirect when the provider reports a
//! blocked popup; other provider errors surface to the caller unclassified.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::bridge::{bridge_fn, bridge_section, call_promise, json_value};
use crate::models::UserInfo;
use crate::store::WatchHandle;

const AUTH_SECTION: &str = "auth";

#[derive(Clone, Debug)]
pub(crate) struct AuthError {
    pub message: String,
}

impl AuthError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub(crate) type AuthResult<T> = Result<T, AuthError>;

pub(crate) type AuthCallback = Rc<dyn Fn(Option<UserInfo>)>;

pub(crate) trait IdentityGateway {
    /// Live auth state. Fires with the current user immediately, on every
    /// sign-in/out, and with the collected result of a redirect flow after
    /// the next load.
    fn watch(&self, on_change: AuthCallback) -> WatchHandle;

    /// Interactive sign-in: popup first, redirect fallback when blocked.
    /// A successful redirect handoff resolves without a user; the user
    /// arrives through `watch` after the round trip.
    fn sign_in(&self) -> LocalBoxFuture<'static, AuthResult<()>>;

    fn sign_out(&self) -> LocalBoxFuture<'static, AuthResult<()>>;
}

/// Provider error messages that mean "the popup never opened".
pub(crate) fn is_popup_blocked(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("popup-blocked") || m.contains("popup_blocked")
}

#[derive(Clone, Copy, Default)]
pub(crate) struct BridgeAuth;

impl BridgeAuth {
    pub fn new() -> Self {
        Self
    }
}

fn auth_fn(name: &str) -> AuthResult<(js_sys::Object, js_sys::Function)> {
    let section = bridge_section(AUTH_SECTION).map_err(AuthError::new)?;
    let f = bridge_fn(&section, name).map_err(AuthError::new)?;
    Ok((section, f))
}

impl IdentityGateway for BridgeAuth {
    fn watch(&self, on_change: AuthCallback) -> WatchHandle {
        let (section, subscribe) = match auth_fn("onAuthStateChanged") {
            Ok(pair) => pair,
            Err(e) => {
                leptos::logging::error!("auth bridge unavailable: {e}");
                on_change(None);
                return WatchHandle::dead();
            }
        };

        let cb = Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
            let user = json_value(&payload)
                .ok()
                .and_then(|v| UserInfo::from_value(&v));
            on_change(user);
        });

        let unsub = subscribe
            .call1(&section, cb.as_ref().unchecked_ref())
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok());

        WatchHandle::new(move || {
            if let Some(unsub) = &unsub {
                let _ = unsub.call0(&JsValue::NULL);
            }
            drop(cb);
        })
    }

    fn sign_in(&self) -> LocalBoxFuture<'static, AuthResult<()>> {
        async move {
            let (section, popup) = auth_fn("signInPopup")?;
            match call_promise(&popup, &section, &[]).await {
                Ok(_) => Ok(()),
                Err(message) if is_popup_blocked(&message) => {
                    // Redirect flow: the page navigates away and the user is
                    // collected by `watch` on the next load.
                    let (section, redirect) = auth_fn("signInRedirect")?;
                    call_promise(&redirect, &section, &[])
                        .await
                        .map(|_| ())
                        .map_err(AuthError::new)
                }
                Err(message) => Err(AuthError::new(message)),
            }
        }
        .boxed_local()
    }

    fn sign_out(&self) -> LocalBoxFuture<'static, AuthResult<()>> {
        async move {
            let (section, sign_out) = auth_fn("signOut")?;
            call_promise(&sign_out, &section, &[])
                .await
                .map(|_| ())
                .map_err(AuthError::new)
        }
        .boxed_local()
    }
}

/// Scripted gateway for native tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;

    use super::*;

    #[derive(Clone, Default)]
    pub(crate) struct FakeAuth {
        inner: Rc<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        listeners: RefCell<Vec<AuthCallback>>,
        current: RefCell<Option<UserInfo>>,
        next_user: RefCell<Option<UserInfo>>,
    }

    impl FakeAuth {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_next_user(&self, user: UserInfo) {
            *self.inner.next_user.borrow_mut() = Some(user);
        }

        pub fn emit(&self, user: Option<UserInfo>) {
            *self.inner.current.borrow_mut() = user.clone();
            let listeners = self.inner.listeners.borrow().clone();
            for cb in listeners {
                cb(user.clone());
            }
        }
    }

    impl IdentityGateway for FakeAuth {
        fn watch(&self, on_change: AuthCallback) -> WatchHandle {
            self.inner.listeners.borrow_mut().push(on_change.clone());
            on_change(self.inner.current.borrow().clone());
            WatchHandle::new(|| {})
        }

        fn sign_in(&self) -> LocalBoxFuture<'static, AuthResult<()>> {
            let user = self.inner.next_user.borrow().clone();
            let this = self.clone();
            async move {
                match user {
                    Some(u) => {
                        this.emit(Some(u));
                        Ok(())
                    }
                    None => Err(AuthError::new("no scripted user")),
                }
            }
            .boxed_local()
        }

        fn sign_out(&self) -> LocalBoxFuture<'static, AuthResult<()>> {
            let this = self.clone();
            async move {
                this.emit(None);
                Ok(())
            }
            .boxed_local()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn popup_blocked_detection() {
        assert!(is_popup_blocked("auth/popup-blocked"));
        assert!(is_popup_blocked("Popup_Blocked by browser"));
        assert!(!is_popup_blocked("auth/network-request-failed"));
    }

    #[test]
    fn fake_auth_watch_sees_sign_in_and_out() {
        use std::cell::RefCell;

        let auth = fake::FakeAuth::new();
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();

        let seen2 = seen.clone();
        let _handle = auth.watch(Rc::new(move |u| {
            seen2.borrow_mut().push(u.map(|u| u.uid));
        }));

        auth.set_next_user(UserInfo {
            uid: "u1".into(),
            display_name: String::new(),
            email: String::new(),
        });
        block_on(auth.sign_in()).unwrap();
        block_on(auth.sign_out()).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![None, Some("u1".to_string()), None]
        );
    }
}
