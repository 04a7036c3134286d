use std::sync::Arc;

use clap::Parser;
use dev_connect::composer::{Composer, ComposerAction};
use dev_connect::config::{Cli, Config};
use dev_connect::models::User;
use dev_connect::render::render;
use dev_connect::{mount, ApiClient, AppSession, Backend, ChatContext, Route, WsConnector};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

const SCREEN_WIDTH: usize = 72;
const SCREEN_HEIGHT: usize = 20;

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = match Config::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let api = match ApiClient::new(
        config.api_base.clone(),
        config.session_token.clone(),
        config.request_timeout,
    ) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    let session = AppSession::new();
    if let Err(e) = session.restore(api.as_ref()).await {
        error!("could not restore session: {}", e);
        eprintln!("{}", e.notice());
        std::process::exit(1);
    }

    let ctx = ChatContext {
        session: session.clone(),
        backend: api.clone(),
        connector: Arc::new(
            WsConnector::new(config.socket_url.clone(), config.session_token.clone())
                .with_timeout(config.request_timeout),
        ),
    };
    let chat = mount(ctx, &config.peer);
    let mut snapshots = chat.snapshots();
    let mut session_state = session.subscribe();
    let mut composer = Composer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("failed to read input: {}", e);
                        break;
                    }
                };
                match line.trim() {
                    "/quit" => break,
                    "/logout" => {
                        if let Err(e) = session.logout(api.as_ref()).await {
                            error!("logout failed: {}", e);
                        }
                    }
                    "/profile" => {
                        chat.view_profile();
                    }
                    other if other.starts_with("/open ") => {
                        let peer = other.trim_start_matches("/open ").trim();
                        if !peer.is_empty() {
                            chat.switch_peer(peer);
                        }
                    }
                    _ => {
                        if let ComposerAction::Submit(text) = composer.enter_line(&line) {
                            chat.send(&text);
                        }
                    }
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for row in render(&snapshot, &composer, SCREEN_WIDTH, SCREEN_HEIGHT) {
                    println!("{row}");
                }
            }
            changed = session_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let route = session_state.borrow_and_update().route.clone();
                match route {
                    Route::Login => {
                        info!("signed out, closing chat");
                        break;
                    }
                    Route::Profile(peer_id) => {
                        match session.guard(api.profile(&peer_id).await) {
                            Ok(peer) => print_profile(&peer),
                            Err(e) => eprintln!("{}", e.notice()),
                        }
                        if session.user().is_some() {
                            session.navigate(Route::Chat(peer_id));
                        }
                    }
                    Route::Feed | Route::Chat(_) => {}
                }
            }
        }
    }

    chat.unmount().await;
}

fn print_profile(user: &User) {
    println!("{}", user.display_name());
    println!("avatar: {}", user.avatar_url());
    if let Some(about) = &user.about {
        println!("{about}");
    }
    if !user.skills.is_empty() {
        println!("skills: {}", user.skills.join(", "));
    }
}
