use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use driftline::{
    CatchState, EngineConfig, EngineEvent, FishingClient, SessionId, SessionStore, StatusApi,
};

pub async fn run(
    client: FishingClient,
    mut events: mpsc::Receiver<EngineEvent>,
    config: &EngineConfig,
) -> anyhow::Result<()> {
    let api = StatusApi::new(&config.api_url, &config.token);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("driftline console; type 'help' for commands");
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => print_event(&event),
                    None => break,
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(line.trim(), &client, &api).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("error: {}", e),
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Returns Ok(true) when the loop should exit.
async fn handle_line(
    line: &str,
    client: &FishingClient,
    api: &StatusApi,
) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(false);
    };
    let args: Vec<&str> = parts.collect();
    let store = client.snapshot();

    match command {
        "help" => print_help(),
        "status" => print_status(&store, client.is_connected()),
        "cast" => {
            let rod_id = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: cast <rod_id> [x y]"))?
                .parse()?;
            let x = args.get(1).map(|v| v.parse()).transpose()?.unwrap_or(50.0);
            let y = args.get(2).map(|v| v.parse()).transpose()?.unwrap_or(50.0);
            client.cast(rod_id, x, y)?;
        }
        "strike" => {
            let id = parse_session(&args, || strike_target(&store))?;
            client.strike(id)?;
        }
        "reel" => {
            let id = parse_session(&args, || store.active_session_id())?;
            client.reel_in(id)?;
        }
        "pull" => {
            let id = parse_session(&args, || store.active_session_id())?;
            client.pull(id)?;
        }
        "keep" => {
            let id = parse_session(&args, || caught_target(&store))?;
            client.keep(id)?;
        }
        "release" => {
            let id = parse_session(&args, || caught_target(&store))?;
            client.release(id)?;
        }
        "retrieve" => {
            let id = parse_session(&args, || store.active_session_id())?;
            client.retrieve(id)?;
        }
        "toggle" => {
            let id = parse_session(&args, || store.active_session_id())?;
            let retrieving = store.session(id).map(|s| s.is_retrieving).unwrap_or(false);
            client.update_retrieve(id, !retrieving)?;
        }
        "bait" => {
            let bait_id = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: bait <bait_id> [session]"))?
                .parse()?;
            let id = parse_session(&args[1..], || store.active_session_id())?;
            client.change_bait(id, bait_id)?;
        }
        "active" => {
            let id: SessionId = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: active <session_id>"))?
                .parse()?;
            client.set_active_session(Some(id))?;
        }
        "leave" => {
            leave_location(client, api, &store).await?;
        }
        "quit" | "exit" => return Ok(true),
        other => eprintln!("unknown command: {} (try 'help')", other),
    }
    Ok(false)
}

fn parse_session(
    args: &[&str],
    fallback: impl FnOnce() -> Option<SessionId>,
) -> anyhow::Result<SessionId> {
    if let Some(raw) = args.first() {
        return Ok(raw.parse()?);
    }
    fallback().ok_or_else(|| anyhow::anyhow!("no session selected"))
}

/// Prefers a biting rod, then a nibbling one, then the active session.
fn strike_target(store: &SessionStore) -> Option<SessionId> {
    store
        .first_in(CatchState::Bite)
        .or_else(|| store.first_in(CatchState::Nibble))
        .map(|s| s.id)
        .or(store.active_session_id())
}

fn caught_target(store: &SessionStore) -> Option<SessionId> {
    store.caught_info().map(|info| info.session_id)
}

/// Rods with no fish activity get a retrieve call on departure; a
/// biting, fighting or caught session is left for its own flow.
fn should_retrieve(state: CatchState) -> bool {
    matches!(
        state,
        CatchState::Idle | CatchState::Waiting | CatchState::Nibble
    )
}

/// Retrieves every undisturbed rod still in the water, then resets
/// local state.
async fn leave_location(
    client: &FishingClient,
    api: &StatusApi,
    store: &SessionStore,
) -> anyhow::Result<()> {
    for session in store.sessions() {
        if !should_retrieve(session.state) {
            continue;
        }
        if let Err(e) = api.retrieve_rod(session.id).await {
            log::warn!("retrieve of session {} failed: {}", session.id, e);
        }
    }
    client.reset()?;
    println!("left the location");
    Ok(())
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::Connected => println!("* connected"),
        EngineEvent::Disconnected => println!("* connection lost, retrying"),
        EngineEvent::NibbleStarted { session_id } => {
            println!("* nibble on session {}", session_id)
        }
        EngineEvent::BiteStarted { session_id } => {
            println!("* BITE on session {}! strike now", session_id)
        }
        EngineEvent::CastAccepted { session_id, slot } => {
            println!("* cast accepted: session {} in slot {}", session_id, slot)
        }
        EngineEvent::Hooked(data) => {
            println!("* hooked a {} on session {}", data.fish, data.session_id)
        }
        EngineEvent::Caught(data) => println!(
            "* caught {} ({:.2} kg, {:.0} cm) on session {}; keep or release?",
            data.fish, data.weight, data.length, data.session_id
        ),
        EngineEvent::FightLost { session_id, kind } => {
            println!("* fight lost on session {}: {:?}", session_id, kind)
        }
        EngineEvent::Kept(details) => println!("* kept: {:?}", details),
        EngineEvent::Released {
            karma_bonus,
            karma_total,
        } => println!("* released (+{} karma, total {})", karma_bonus, karma_total),
        EngineEvent::RodRetrieved { session_id } => {
            println!("* rod retrieved (session {})", session_id)
        }
        EngineEvent::BaitChanged {
            session_id,
            new_bait,
            bait_remaining,
        } => println!(
            "* bait on session {} is now {} ({} left)",
            session_id, new_bait, bait_remaining
        ),
        EngineEvent::CommandRejected { message } => println!("! {}", message),
        EngineEvent::CommandTimedOut { kind, session_id } => {
            println!("! {:?} timed out (session {:?})", kind, session_id)
        }
    }
}

fn print_status(store: &SessionStore, connected: bool) {
    println!(
        "connection: {}",
        if connected { "up" } else { "down" }
    );
    if let Some(time) = store.game_time() {
        println!(
            "game time: day {} {:02}:00 ({:?})",
            time.day, time.hour, time.time_of_day
        );
    }
    if store.session_count() == 0 {
        println!("no rods in the water");
    }
    for session in store.sessions() {
        let marker = if Some(session.id) == store.active_session_id() {
            '*'
        } else {
            ' '
        };
        let mut line = format!(
            "{} slot {}: session {} rod '{}' {:?}",
            marker, session.slot, session.id, session.rod_name, session.state
        );
        if session.is_retrieving {
            line.push_str(&format!(
                " (retrieving {:.0}%)",
                session.retrieve_progress * 100.0
            ));
        }
        println!("{}", line);
        if let Some(fight) = store.fight(session.id) {
            println!(
                "    tension {:.1} distance {:.1} durability {:.1}",
                fight.tension, fight.distance, fight.rod_durability
            );
        }
    }
    if let Some(info) = store.caught_info() {
        println!(
            "caught and waiting for a decision: {} on session {}",
            info.fish, info.session_id
        );
    }
}

fn print_help() {
    println!("commands:");
    println!("  cast <rod_id> [x y]     cast a rod (up to 3)");
    println!("  strike [session]        strike on a bite");
    println!("  reel [session]          reel in during a fight");
    println!("  pull [session]          pull the rod during a fight");
    println!("  keep [session]          keep a caught fish");
    println!("  release [session]       release a caught fish");
    println!("  retrieve [session]      take a rod out of the water");
    println!("  toggle [session]        toggle retrieving the line");
    println!("  bait <bait_id> [session]  change bait");
    println!("  active <session>        select the active rod");
    println!("  status                  show rods, fights, game time");
    println!("  leave                   retrieve all rods and reset");
    println!("  quit                    exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_retrieves_only_undisturbed_rods() {
        assert!(should_retrieve(CatchState::Idle));
        assert!(should_retrieve(CatchState::Waiting));
        assert!(should_retrieve(CatchState::Nibble));
        assert!(!should_retrieve(CatchState::Bite));
        assert!(!should_retrieve(CatchState::Fighting));
        assert!(!should_retrieve(CatchState::Caught));
    }
}
