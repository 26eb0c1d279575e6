//! 导航管理集成测试

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use navix_core::navigation::{lifecycle_events, NavigationRequest};
use navix_core::{
    Event, Navix, NavixConfig, NavixError, NavigationDescriptor, Params, UiHandle,
};

/// 模拟窗口
#[derive(Default)]
struct MockWindow {
    title: String,
    params: Params,
    hidden: AtomicBool,
    shows: AtomicUsize,
    closes: AtomicUsize,
    raises: AtomicUsize,
}

impl MockWindow {
    fn new(title: &str, params: Params) -> Self {
        Self {
            title: title.to_string(),
            params,
            hidden: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// 用户从外部隐藏窗口
    fn hide(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }
}

impl UiHandle for MockWindow {
    fn show(&self) -> navix_core::Result<()> {
        self.hidden.store(false, Ordering::SeqCst);
        self.shows.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> navix_core::Result<()> {
        self.hidden.store(true, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn raise(&self) -> navix_core::Result<()> {
        self.raises.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 记录所有创建出的窗口
#[derive(Clone, Default)]
struct WindowLog {
    windows: Arc<Mutex<Vec<Arc<MockWindow>>>>,
}

impl WindowLog {
    fn descriptor(&self, route: &str, singleton: bool) -> NavigationDescriptor {
        let windows = self.windows.clone();
        let title = route.to_string();
        let factory = move |params: &Params| -> navix_core::Result<Arc<dyn UiHandle>> {
            let window = Arc::new(MockWindow::new(&title, params.clone()));
            windows.lock().push(window.clone());
            Ok(window)
        };
        NavigationDescriptor::builder(route, factory)
            .singleton(singleton)
            .build()
    }

    fn created(&self) -> usize {
        self.windows.lock().len()
    }

    fn last(&self) -> Arc<MockWindow> {
        self.windows.lock().last().cloned().unwrap()
    }
}

fn setup() -> (Navix, WindowLog) {
    let navix = Navix::new(NavixConfig::builder().max_history(5).build()).unwrap();
    let log = WindowLog::default();
    navix.register(log.descriptor("core.main_window", true)).unwrap();
    navix.register(log.descriptor("core.settings", true)).unwrap();
    navix.register(log.descriptor("asset.viewer", false)).unwrap();
    (navix, log)
}

fn record_events(navix: &Navix) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    navix.subscribe("*", move |event: &Event| {
        sink.lock().push(event.event_type.clone());
        Ok(())
    });
    seen
}

#[test]
fn test_singleton_is_reused_and_raised() {
    let (mut navix, log) = setup();

    let first = navix.navigate_to("core.main_window", Params::new()).unwrap();
    let second = navix.navigate_to("core.main_window", Params::new()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(log.created(), 1);
    assert_eq!(log.last().raises.load(Ordering::SeqCst), 1);
    assert_eq!(navix.voyager().navigation_history().count(), 2);
    assert_eq!(navix.voyager().active_count(), 1);
}

#[test]
fn test_hidden_singleton_is_recreated() {
    let (mut navix, log) = setup();

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    log.last().hide();
    navix.navigate_to("core.main_window", Params::new()).unwrap();

    assert_eq!(log.created(), 2);
    assert_eq!(navix.voyager().active_count(), 1);
}

#[test]
fn test_multi_instance_addressing() {
    let (mut navix, log) = setup();

    navix
        .navigate(NavigationRequest::new("asset.viewer").instance("a-1"))
        .unwrap();
    navix
        .navigate(NavigationRequest::new("asset.viewer").instance("a-2"))
        .unwrap();
    navix
        .navigate(NavigationRequest::new("asset.viewer").instance("a-1"))
        .unwrap();
    navix.navigate_to("asset.viewer", Params::new()).unwrap();

    assert_eq!(log.created(), 3);
    let keys: Vec<String> = navix
        .voyager()
        .get_active_navigations()
        .keys()
        .map(ToString::to_string)
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.contains(&"asset.viewer#a-1".to_string()));
    assert!(keys.contains(&"asset.viewer#a-2".to_string()));
}

#[test]
fn test_creation_params_drop_sensitive_keys() {
    let mut navix = Navix::with_defaults().unwrap();
    let log = WindowLog::default();
    navix.register(log.descriptor("asset.viewer", false)).unwrap();

    let params = Params::from([
        ("asset_id".to_string(), json!("42")),
        ("user_id".to_string(), json!("alice")),
        ("token".to_string(), json!("secret")),
    ]);
    navix
        .navigate(NavigationRequest::new("asset.viewer").params(params))
        .unwrap();

    let window = log.last();
    assert_eq!(window.title, "asset.viewer");
    assert_eq!(window.params.get("asset_id"), Some(&json!("42")));
    assert!(!window.params.contains_key("user_id"));
    assert!(!window.params.contains_key("token"));
}

#[test]
fn test_history_is_bounded() {
    let (mut navix, _log) = setup();
    for i in 0..8 {
        navix
            .navigate(NavigationRequest::new("asset.viewer").instance(format!("v{i}")))
            .unwrap();
    }

    let history: Vec<String> = navix
        .voyager()
        .navigation_history()
        .map(|entry| entry.key.instance.clone())
        .collect();
    assert_eq!(history, vec!["v3", "v4", "v5", "v6", "v7"]);
}

#[test]
fn test_back_reactivates_previous() {
    let (mut navix, log) = setup();

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    let main = log.last();
    navix.navigate_to("core.settings", Params::new()).unwrap();

    let back = navix.navigate_back().unwrap().unwrap();
    assert!(Arc::ptr_eq(&back, &(main.clone() as Arc<dyn UiHandle>)));
    assert_eq!(main.raises.load(Ordering::SeqCst), 1);
    assert_eq!(main.shows.load(Ordering::SeqCst), 2);
    // 后退不关闭任何实例
    assert_eq!(navix.voyager().active_count(), 2);

    assert!(navix.navigate_back().unwrap().is_none());
    assert!(navix.navigate_back().unwrap().is_none());
}

#[test]
fn test_back_skips_closed_previous() {
    let (mut navix, _log) = setup();

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    navix.navigate_to("core.settings", Params::new()).unwrap();
    assert!(navix.close_navigation("core.main_window", None).unwrap());

    assert!(navix.navigate_back().unwrap().is_none());
}

#[test]
fn test_current_ui_follows_history() {
    let (mut navix, _log) = setup();

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    let settings = navix.navigate_to("core.settings", Params::new()).unwrap();
    let current = navix.voyager().get_current_ui().unwrap();
    assert!(Arc::ptr_eq(&current, &settings));

    navix.close_navigation("core.settings", None).unwrap();
    let key = navix.voyager().current_key().unwrap();
    assert_eq!(key.route.as_str(), "core.main_window");
}

#[test]
fn test_lifecycle_event_order() {
    let (mut navix, log) = setup();
    let seen = record_events(&navix);

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    navix.close_navigation("core.main_window", None).unwrap();

    assert_eq!(
        *seen.lock(),
        vec![
            lifecycle_events::BEFORE_NAVIGATE,
            lifecycle_events::AFTER_NAVIGATE,
            lifecycle_events::BEFORE_CLOSE,
            lifecycle_events::AFTER_CLOSE,
        ]
    );
    assert_eq!(log.last().closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_navigation_publishes_cause() {
    let (mut navix, _log) = setup();
    let cause = Arc::new(Mutex::new(None));
    let sink = cause.clone();
    navix.subscribe(lifecycle_events::NAVIGATION_FAILED, move |event: &Event| {
        *sink.lock() = event.error.as_ref().map(|e| e.error_code());
        Ok(())
    });

    let err = navix.navigate_to("core.missing", Params::new()).unwrap_err();
    assert!(matches!(err, NavixError::Navigation { .. }));
    assert!(matches!(err.cause(), Some(NavixError::RouteNotFound(_))));
    assert_eq!(*cause.lock(), Some(err.root_cause().error_code()));
    assert_eq!(navix.voyager().navigation_history().count(), 0);
}

#[test]
fn test_failing_subscriber_does_not_break_navigation() {
    let (mut navix, _log) = setup();
    navix.subscribe(lifecycle_events::AFTER_NAVIGATE, |_event: &Event| {
        anyhow::bail!("subscriber failure")
    });
    navix.subscribe(lifecycle_events::AFTER_NAVIGATE, |_event: &Event| -> anyhow::Result<()> {
        panic!("subscriber panic")
    });

    assert!(navix.navigate_to("core.main_window", Params::new()).is_ok());
    assert_eq!(navix.voyager().active_count(), 1);
}

#[test]
fn test_force_new_replaces_instance() {
    let (mut navix, log) = setup();

    navix.navigate_to("core.main_window", Params::new()).unwrap();
    let old = log.last();
    navix
        .navigate(NavigationRequest::new("core.main_window").force_new(true))
        .unwrap();

    assert_eq!(log.created(), 2);
    assert_eq!(old.closes.load(Ordering::SeqCst), 1);
    assert_eq!(navix.voyager().active_count(), 1);
}

#[test]
fn test_shutdown_closes_fleet() {
    let (mut navix, log) = setup();
    navix.navigate_to("core.main_window", Params::new()).unwrap();
    navix
        .navigate(NavigationRequest::new("asset.viewer").instance("x"))
        .unwrap();

    assert_eq!(navix.shutdown().unwrap(), 2);
    assert_eq!(navix.voyager().active_count(), 0);
    assert_eq!(navix.voyager().navigation_history().count(), 0);
    assert!(log
        .windows
        .lock()
        .iter()
        .all(|w| w.closes.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_rejected_parameter_fails_navigation_once() {
    let mut navix = Navix::new(NavixConfig::builder().parameter_rule("theme").build()).unwrap();
    let log = WindowLog::default();
    navix.register(log.descriptor("core.settings", true)).unwrap();

    let failures = Arc::new(AtomicUsize::new(0));
    let counter = failures.clone();
    navix.subscribe(lifecycle_events::NAVIGATION_FAILED, move |_event: &Event| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let err = navix
        .navigate_to("core.settings", Params::from([("theme".to_string(), json!("neon"))]))
        .unwrap_err();
    assert!(matches!(err, NavixError::Navigation { .. }));
    match err.root_cause() {
        NavixError::ParameterValidation { param, .. } => assert_eq!(param, "theme"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(log.windows.lock().is_empty());
    assert!(navix.voyager().get_current_ui().is_none());
}
