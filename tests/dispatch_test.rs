//! Dispatch and plugin lifecycle scenarios
//! Run with: cargo test --test dispatch_test

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crewbot::application::messaging::{DispatchOptions, DispatchOutcome, Dispatcher};
use crewbot::application::services::PluginService;
use crewbot::domain::entities::{
    callback, role, Chat, ChatKind, Command, IncomingMessage, Sender, Update, UpdateKind, User,
};
use crewbot::domain::traits::Store;
use crewbot::infrastructure::adapters::{ConsoleAdapter, Outgoing};
use crewbot::infrastructure::storage::MemoryStore;
use crewbot::plugins::echo::EchoPlugin;
use crewbot::plugins::Plugin;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

struct Bench {
    service: Arc<PluginService>,
    store: Arc<MemoryStore>,
    output: mpsc::UnboundedReceiver<Outgoing>,
}

impl Bench {
    fn new() -> Self {
        ensure_init();
        let store = Arc::new(MemoryStore::new());
        let (adapter, output) = ConsoleAdapter::recording();
        let service = Arc::new(PluginService::new(store.clone(), Arc::new(adapter)));
        Self {
            service,
            store,
            output,
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.service))
    }

    async fn user(&self, telegram_id: i64, role: &str) {
        self.store
            .create_user_if_absent(&User::new(telegram_id).with_role(role))
            .await
            .unwrap();
    }

    fn sent(&mut self) -> Vec<Outgoing> {
        let mut out = Vec::new();
        while let Ok(event) = self.output.try_recv() {
            out.push(event);
        }
        out
    }
}

/// Records every invocation's `(args, telegram_id)`
fn recorder(calls: Arc<Mutex<Vec<(String, i64)>>>) -> crewbot::domain::entities::CommandCallback {
    callback(move |ctx| {
        let calls = Arc::clone(&calls);
        async move {
            calls.lock().unwrap().push((ctx.args.clone(), ctx.user.telegram_id));
            Ok(())
        }
    })
}

fn text(id: i64, from: i64, body: &str) -> Update {
    Update::text(id, Sender::new(from), body)
}

#[tokio::test]
async fn test_unregister_twice_is_noop() {
    let bench = Bench::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    bench
        .service
        .register_command(Command::new("x", "", role::MEMBERS, recorder(calls)));

    bench.service.unregister_command("x");
    bench.service.unregister_command("x");

    assert!(!bench.service.commands().contains("x"));
    assert!(!bench.service.is_allowed("x", role::MEMBER));
}

#[tokio::test]
async fn test_latest_registration_wins() {
    let bench = Bench::new();
    bench.user(10, role::MEMBER).await;
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    bench
        .service
        .register_command(Command::new("x", "", &[role::ADMIN], recorder(first.clone())));
    bench
        .service
        .register_command(Command::new("x", "", &[role::MEMBER], recorder(second.clone())));

    let outcome = bench.dispatcher().dispatch(text(1, 10, "/x")).await;

    assert_eq!(outcome, DispatchOutcome::Handled { command: "x".to_string() });
    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
    assert!(!bench.service.is_allowed("x", role::ADMIN));
}

#[tokio::test]
async fn test_member_runs_command_new_user_does_not() {
    let mut bench = Bench::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    bench
        .service
        .register_command(Command::new("echo", "", &[role::MEMBER], recorder(calls.clone())));
    bench.user(10, role::MEMBER).await;
    let dispatcher = bench.dispatcher();

    let outcome = dispatcher.dispatch(text(1, 10, "/echo hi")).await;
    assert_eq!(outcome, DispatchOutcome::Handled { command: "echo".to_string() });
    assert_eq!(*calls.lock().unwrap(), vec![("hi".to_string(), 10)]);

    // unseen sender is created with role "new"
    let outcome = dispatcher.dispatch(text(2, 20, "/echo hi")).await;
    assert_eq!(
        outcome,
        DispatchOutcome::Forbidden {
            command: "echo".to_string(),
            role: role::NEW.to_string(),
        }
    );
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(bench.sent().is_empty());
    assert_eq!(bench.store.get_user(20).await.unwrap().unwrap().role, role::NEW);
}

#[tokio::test]
async fn test_each_update_invokes_one_callback_once() {
    let bench = Bench::new();
    bench.user(10, role::ADMIN).await;
    let a = Arc::new(Mutex::new(Vec::new()));
    let b = Arc::new(Mutex::new(Vec::new()));
    bench
        .service
        .register_command(Command::new("a", "", role::STAFF, recorder(a.clone())));
    bench
        .service
        .register_command(Command::new("b", "", role::STAFF, recorder(b.clone())));

    bench.dispatcher().dispatch(text(1, 10, "/a one two")).await;

    assert_eq!(*a.lock().unwrap(), vec![("one two".to_string(), 10)]);
    assert!(b.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_command_gets_notice() {
    let mut bench = Bench::new();
    let outcome = bench.dispatcher().dispatch(text(1, 10, "/nope")).await;

    assert_eq!(outcome, DispatchOutcome::UnknownCommand("nope".to_string()));
    let sent = bench.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Outgoing::Message { chat_id: 10, text, .. }
        if text == "unknown command nope, use /help"));

    let quiet = Dispatcher::new(Arc::clone(&bench.service)).with_options(DispatchOptions {
        notify_unknown: false,
        ..DispatchOptions::default()
    });
    quiet.dispatch(text(2, 10, "/nope")).await;
    assert!(bench.sent().is_empty());
}

#[tokio::test]
async fn test_blocked_user_is_rejected_without_side_effects() {
    let mut bench = Bench::new();
    bench.service.bootstrap(vec![Arc::new(EchoPlugin)]).await;
    bench.user(10, role::BLOCKED).await;

    let outcome = bench.dispatcher().dispatch(text(1, 10, "/echo hi")).await;

    assert_eq!(
        outcome,
        DispatchOutcome::Rejected {
            telegram_id: 10,
            role: role::BLOCKED.to_string(),
        }
    );
    assert!(bench.sent().is_empty());
    assert!(bench.store.messages().await.is_empty());
}

#[tokio::test]
async fn test_group_chat_is_logged_but_not_routed() {
    let mut bench = Bench::new();
    bench.service.bootstrap(vec![Arc::new(EchoPlugin)]).await;

    let update = Update {
        id: 1,
        kind: UpdateKind::Message(IncomingMessage {
            message_id: 1,
            chat: Chat {
                id: -100,
                kind: ChatKind::Supergroup,
                title: Some("crew".to_string()),
            },
            from: Sender::new(10),
            text: Some("/echo hi".to_string()),
            date: chrono::Utc::now(),
        }),
    };

    assert_eq!(bench.dispatcher().dispatch(update).await, DispatchOutcome::Ignored);
    assert!(bench.sent().is_empty());

    let logged = bench.store.messages().await;
    assert_eq!(logged.len(), 1);
    assert!(logged[0].is_incoming);
}

fn supergroup_message(id: i64, title: &str, body: &str) -> Update {
    Update {
        id,
        kind: UpdateKind::Message(IncomingMessage {
            message_id: id,
            chat: Chat {
                id: -100,
                kind: ChatKind::Supergroup,
                title: Some(title.to_string()),
            },
            from: Sender::new(10),
            text: Some(body.to_string()),
            date: chrono::Utc::now(),
        }),
    }
}

#[tokio::test]
async fn test_supergroup_is_recorded_and_retitled() {
    let bench = Bench::new();
    let dispatcher = bench.dispatcher();

    dispatcher.dispatch(supergroup_message(1, "crew", "hello")).await;
    dispatcher.dispatch(supergroup_message(2, "crew", "again")).await;
    let chats = bench.store.list_groupchats(&[]).await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].to_string(), "crew [-100]");

    dispatcher.dispatch(supergroup_message(3, "crew ops", "renamed")).await;
    let chats = bench.store.list_groupchats(&[]).await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].title, "crew ops");

    // private chats are never recorded
    dispatcher.dispatch(text(4, 10, "/nope")).await;
    assert_eq!(bench.store.list_groupchats(&[]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_echo_reply_is_logged_both_ways() {
    let mut bench = Bench::new();
    bench.service.bootstrap(vec![Arc::new(EchoPlugin)]).await;

    bench.dispatcher().dispatch(text(1, 10, "/echo@crewbot hi")).await;

    let sent = bench.sent();
    assert_eq!(sent[0].text(), Some("echo hi"));
    let logged: Vec<(String, bool)> = bench
        .store
        .messages()
        .await
        .into_iter()
        .map(|m| (m.text, m.is_incoming))
        .collect();
    assert_eq!(
        logged,
        vec![
            ("/echo@crewbot hi".to_string(), true),
            ("echo hi".to_string(), false),
        ]
    );
}

#[tokio::test]
async fn test_callback_payload_is_routed() {
    let bench = Bench::new();
    bench.user(10, role::ADMIN).await;
    let calls = Arc::new(Mutex::new(Vec::new()));
    bench
        .service
        .register_command(Command::new("user", "", role::STAFF, recorder(calls.clone())));

    let update = Update::callback(5, Sender::new(10), "/user 42");
    let outcome = bench.dispatcher().dispatch(update).await;

    assert_eq!(outcome, DispatchOutcome::Handled { command: "user".to_string() });
    assert_eq!(*calls.lock().unwrap(), vec![("42".to_string(), 10)]);
}

fn callback_answer(id: &str) -> Outgoing {
    Outgoing::CallbackAnswer {
        callback_id: id.to_string(),
        text: None,
    }
}

#[tokio::test]
async fn test_unhandled_button_presses_are_answered() {
    let mut bench = Bench::new();
    bench.user(10, role::MEMBER).await;
    let calls = Arc::new(Mutex::new(Vec::new()));
    bench
        .service
        .register_command(Command::new("userblock", "", role::STAFF, recorder(calls.clone())));
    let dispatcher = bench.dispatcher();

    let outcome = dispatcher
        .dispatch(Update::callback(5, Sender::new(10), "/userblock 42"))
        .await;
    assert!(matches!(outcome, DispatchOutcome::Forbidden { .. }));
    assert_eq!(bench.sent(), vec![callback_answer("5")]);

    let outcome = dispatcher.dispatch(Update::callback(6, Sender::new(10), "")).await;
    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert_eq!(bench.sent(), vec![callback_answer("6")]);

    let outcome = dispatcher
        .dispatch(Update::callback(7, Sender::new(10), "/gone"))
        .await;
    assert_eq!(outcome, DispatchOutcome::UnknownCommand("gone".to_string()));
    let sent = bench.sent();
    assert_eq!(sent[0], callback_answer("7"));
    assert_eq!(sent[1].text(), Some("unknown command gone, use /help"));

    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let bench = Bench::new();
    bench.service.register_command(Command::new(
        "slow",
        "",
        role::EVERYONE,
        callback(|_ctx| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }),
    ));

    let dispatcher = bench.dispatcher().with_options(DispatchOptions {
        handler_timeout: Some(Duration::from_millis(20)),
        ..DispatchOptions::default()
    });

    assert_eq!(
        dispatcher.dispatch(text(1, 10, "/slow")).await,
        DispatchOutcome::TimedOut { command: "slow".to_string() }
    );
}

#[tokio::test]
async fn test_run_drains_channel_in_order() {
    let mut bench = Bench::new();
    bench.service.bootstrap(vec![Arc::new(EchoPlugin)]).await;
    let dispatcher = Arc::new(bench.dispatcher());

    let (tx, rx) = mpsc::unbounded_channel();
    for (i, word) in ["one", "two", "three"].iter().enumerate() {
        tx.send(text(i as i64, 10, &format!("/echo {}", word))).unwrap();
    }
    drop(tx);
    dispatcher.run(rx).await;

    let texts: Vec<String> = bench
        .sent()
        .iter()
        .filter_map(|o| o.text().map(str::to_string))
        .collect();
    assert_eq!(texts, vec!["echo one", "echo two", "echo three"]);
}

#[tokio::test]
async fn test_concurrent_run_waits_for_in_flight_updates() {
    let bench = Bench::new();
    let done = Arc::new(AtomicUsize::new(0));
    let counter = done.clone();
    bench.service.register_command(Command::new(
        "slow",
        "",
        role::EVERYONE,
        callback(move |_ctx| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    ));
    let dispatcher = Arc::new(bench.dispatcher().with_options(DispatchOptions {
        concurrent: true,
        ..DispatchOptions::default()
    }));

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(text(1, 10, "/slow")).unwrap();
    drop(tx);
    Arc::clone(&dispatcher).run(rx).await;
    assert_eq!(done.load(Ordering::SeqCst), 1);

    // several slow updates overlap instead of queueing
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..3 {
        tx.send(text(10 + i, 10, "/slow")).unwrap();
    }
    drop(tx);
    let started = Instant::now();
    dispatcher.run(rx).await;

    assert_eq!(done.load(Ordering::SeqCst), 4);
    assert!(started.elapsed() < Duration::from_millis(590));
}

/// Plugin owning `foo`, counting its stops
struct FooPlugin {
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin for FooPlugin {
    fn id(&self) -> &str {
        "foo.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new(
            "foo",
            "",
            &[role::MEMBER, role::ADMIN],
            callback(|_ctx| async { Ok(()) }),
        )]
    }

    async fn on_stop(&self, service: &PluginService) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        service.unregister_command("foo");
    }
}

#[tokio::test]
async fn test_disable_enable_round_trip() {
    let bench = Bench::new();
    let stops = Arc::new(AtomicUsize::new(0));
    bench
        .service
        .bootstrap(vec![Arc::new(FooPlugin { stops: stops.clone() })])
        .await;
    assert!(bench.service.is_allowed("foo", role::MEMBER));

    assert!(bench.service.disable_plugin("foo.Plugin").await);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    for r in [role::NEW, role::MEMBER, role::ADMIN, role::OWNER] {
        assert!(!bench.service.is_allowed("foo", r));
    }

    // second disable is a no-op
    assert!(!bench.service.disable_plugin("foo.Plugin").await);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    assert!(bench.service.enable_plugin(" foo.Plugin").await);
    assert!(bench.service.is_allowed("foo", role::MEMBER));
    assert!(bench.service.plugins().is_active("foo.Plugin"));
    assert!(!bench.service.plugins().is_disabled("foo.Plugin"));

    assert!(bench.service.enable_plugin("foo.Plugin").await);
    assert!(!bench.service.enable_plugin("missing.Plugin").await);
}

#[tokio::test]
async fn test_stored_disabled_state_skips_start() {
    let bench = Bench::new();
    bench
        .store
        .get_or_create_plugin_state("echo.Plugin", crewbot::domain::entities::PluginState::Disabled)
        .await
        .unwrap();

    bench.service.bootstrap(vec![Arc::new(EchoPlugin)]).await;

    assert!(!bench.service.commands().contains("echo"));
    assert!(bench.service.plugins().is_disabled("echo.Plugin"));
}
