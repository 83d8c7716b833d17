//! Integration tests for the supervisor driving a live IRC session.

mod common;

use async_trait::async_trait;
use common::{FakeIrcServer, parse_line};
use ith::config::Config;
use ith::error::HookError;
use ith::hooks::{Hook, HookContext, WelcomeEvent};
use ith::irc::Command;
use ith::message::InboundMessage;
use ith::supervisor::{IrcCommand, RunOutcome, Supervisor};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Records what it sees; answers "ping?" with "pong!" through the handle.
struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
    quit_on_welcome: bool,
}

#[async_trait]
impl Hook for Recorder {
    async fn start(&mut self) -> Result<(), HookError> {
        self.log.lock().push("start".into());
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HookError> {
        self.log.lock().push("stop".into());
        Ok(())
    }

    async fn on_msg(&mut self, ctx: &HookContext<'_>, event: &InboundMessage) {
        self.log.lock().push(format!("msg:{}", event.body));
        if event.body == "ping?" {
            // The ack would only resolve once this hook returns.
            let _ = ctx.handle.send_privmsg(&event.sender, "pong!\nsecond line");
        }
    }

    async fn on_welcome(&mut self, ctx: &HookContext<'_>, event: &WelcomeEvent) {
        self.log.lock().push(format!("welcome:{}", event.server));
        if self.quit_on_welcome {
            let _ = ctx.handle.submit(IrcCommand::Quit {
                reason: Some("bye".into()),
            });
        }
    }
}

fn config(port: u16, grace_window_ms: u64) -> Config {
    let mut config = Config::default();
    config.irc.address = "127.0.0.1".into();
    config.irc.port = port;
    config.irc.nickname = "ith".into();
    config.irc.tls = false;
    config.irc.grace_window_ms = grace_window_ms;
    config
}

fn supervisor_with_recorder(
    config: Config,
    quit_on_welcome: bool,
) -> (Supervisor, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut supervisor = Supervisor::new(config);
    supervisor
        .hooks_mut()
        .register(
            "recorder",
            Box::new(Recorder {
                log: Arc::clone(&log),
                quit_on_welcome,
            }),
        )
        .unwrap();
    (supervisor, log)
}

#[tokio::test]
async fn test_backlog_suppressed_then_forwarded() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let (supervisor, log) = supervisor_with_recorder(config(server.port(), 1000), false);

    let connect = tokio::spawn(supervisor.connect());
    let mut conn = server.accept().await.expect("accept");
    conn.complete_registration("ith").await.expect("registration");
    let connected = connect.await.unwrap().expect("connect");
    let run = tokio::spawn(connected.run());

    conn.send_raw(":alice!a@host PRIVMSG ith :early backlog").await.unwrap();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    conn.send_raw(":alice!a@host PRIVMSG ith :late").await.unwrap();
    conn.send_raw(":alice!a@host PRIVMSG ith :ping?").await.unwrap();

    assert_eq!(
        conn.recv_command_until("PRIVMSG alice").await.unwrap(),
        Command::PRIVMSG("alice".into(), "pong!".into())
    );
    assert_eq!(
        parse_line(&conn.recv_line().await.unwrap()).unwrap().command,
        Command::PRIVMSG("alice".into(), "second line".into())
    );

    conn.send_raw("PING :keepalive").await.unwrap();
    assert_eq!(
        conn.recv_command_until("PONG").await.unwrap(),
        Command::PONG("keepalive".into(), None)
    );

    drop(conn);
    assert_eq!(run.await.unwrap(), RunOutcome::Disconnected);

    assert_eq!(
        *log.lock(),
        vec![
            "start",
            "welcome:test.server",
            "msg:late",
            "msg:ping?",
            "stop",
        ]
    );
}

#[tokio::test]
async fn test_quit_command_ends_session() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let (supervisor, log) = supervisor_with_recorder(config(server.port(), 0), true);

    let connect = tokio::spawn(supervisor.connect());
    let mut conn = server.accept().await.expect("accept");
    conn.complete_registration("ith").await.expect("registration");
    let connected = connect.await.unwrap().expect("connect");
    let run = tokio::spawn(connected.run());

    assert_eq!(
        conn.recv_command_until("QUIT").await.unwrap(),
        Command::QUIT(Some("bye".into()))
    );
    assert!(conn.is_closed_within(Duration::from_secs(5)).await);
    assert_eq!(run.await.unwrap(), RunOutcome::Disconnected);

    let log = log.lock();
    assert_eq!(log.first().map(String::as_str), Some("start"));
    assert_eq!(log.iter().filter(|l| *l == "stop").count(), 1);
}

#[tokio::test]
async fn test_server_error_then_close_stops_hooks_once() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let (supervisor, log) = supervisor_with_recorder(config(server.port(), 0), false);

    let connect = tokio::spawn(supervisor.connect());
    let mut conn = server.accept().await.expect("accept");
    conn.complete_registration("ith").await.expect("registration");
    let connected = connect.await.unwrap().expect("connect");
    let run = tokio::spawn(connected.run());

    conn.send_raw("ERROR :Closing link (test)").await.unwrap();
    drop(conn);

    assert_eq!(run.await.unwrap(), RunOutcome::Disconnected);
    assert_eq!(log.lock().iter().filter(|l| *l == "stop").count(), 1);
}

#[tokio::test]
async fn test_connect_sends_password_first() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let mut config = config(server.port(), 0);
    config.irc.password = Some("sekrit".into());
    config.irc.username = Some("ident".into());
    let supervisor = Supervisor::new(config);

    let connect = tokio::spawn(supervisor.connect());
    let mut conn = server.accept().await.expect("accept");
    let lines = conn.complete_registration("ith").await.expect("registration");
    connect.await.unwrap().expect("connect");

    let commands: Vec<Command> = lines
        .iter()
        .map(|l| parse_line(l).unwrap().command)
        .collect();
    assert_eq!(commands[0], Command::PASS("sekrit".into()));
    assert_eq!(commands[1], Command::NICK("ith".into()));
    assert!(matches!(&commands[2], Command::USER(user, mode, _) if user == "ident" && mode == "0"));
}

#[tokio::test]
async fn test_channel_messages_not_forwarded() {
    let server = FakeIrcServer::bind().await.expect("bind");
    let (supervisor, log) = supervisor_with_recorder(config(server.port(), 0), false);

    let connect = tokio::spawn(supervisor.connect());
    let mut conn = server.accept().await.expect("accept");
    conn.complete_registration("ith").await.expect("registration");
    let connected = connect.await.unwrap().expect("connect");
    let run = tokio::spawn(connected.run());

    conn.send_raw(":alice!a@host PRIVMSG #rust :channel chatter").await.unwrap();
    conn.send_raw(":alice!a@host PRIVMSG ITH :direct").await.unwrap();
    conn.send_raw("PING :sync").await.unwrap();
    conn.recv_until("PONG").await.unwrap();

    drop(conn);
    assert_eq!(run.await.unwrap(), RunOutcome::Disconnected);
    assert_eq!(
        *log.lock(),
        vec!["start", "welcome:test.server", "msg:direct", "stop"]
    );
}
