//! Hub CLI commands: login, logout, status, and sync.
//!
//! `hubsync login`   exchange user/password for a stored credential
//! `hubsync logout`  forget the stored credential
//! `hubsync status`  show who is logged in and whether the token is stale
//! `hubsync sync`    resolve an application and pull its profile bundles

use std::path::PathBuf;

use hubsync_client::{
    is_expired, login, sync_profiles, ApplicationLookup, CredentialStore, FileCredentialStore,
    HubClient, HubError, Settings, SyncReport,
};

use crate::exit_codes::*;
use crate::CliError;

// ── Login ───────────────────────────────────────────────────────────

pub fn cmd_login(
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
) -> Result<(), CliError> {
    let settings = load_settings()?;
    let host = host.or(settings.host.clone()).ok_or_else(|| {
        CliError::args("No Hub host given")
            .with_hint("pass --host, set HUBSYNC_HOST, or add \"host\" to settings.json")
    })?;

    let interactive = atty::is(atty::Stream::Stdin);
    let user = match user {
        Some(u) => u,
        None if interactive => dialoguer::Input::<String>::new()
            .with_prompt("User")
            .interact_text()
            .map_err(|e| CliError::io(e.to_string()))?,
        None => {
            return Err(CliError::args("No user provided and stdin is not a TTY")
                .with_hint("pass --user or set HUBSYNC_USER"));
        }
    };
    let password = match password {
        Some(p) => p,
        None if interactive => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| CliError::io(e.to_string()))?,
        None => {
            return Err(CliError::args("No password provided and stdin is not a TTY")
                .with_hint("pass --password or set HUBSYNC_PASSWORD"));
        }
    };

    // Login needs no credential; an anonymous client carries the timeout.
    let client = HubClient::anonymous(&host, &settings).map_err(CliError::hub)?;
    let creds = login(client.http(), &host, &user, &password).map_err(|e| match e {
        HubError::Http { status: 401, .. } | HubError::Http { status: 403, .. } => CliError {
            code: EXIT_HUB_NOT_AUTH,
            message: "Invalid user or password".into(),
            hint: None,
        },
        other => CliError::hub(other),
    })?;

    let store = store()?;
    store.save(&creds).map_err(CliError::hub)?;
    log::info!("credential saved to {}", store.path().display());
    eprintln!("Logged in to {} as {}", creds.host, creds.user);
    Ok(())
}

// ── Logout ──────────────────────────────────────────────────────────

pub fn cmd_logout() -> Result<(), CliError> {
    store()?.delete().map_err(CliError::hub)?;
    eprintln!("Logged out");
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

pub fn cmd_status() -> Result<(), CliError> {
    let creds = store()?.load().map_err(CliError::hub)?;

    let token_state = match is_expired(&creds.access_token) {
        Ok(false) => "valid".to_string(),
        Ok(true) if creds.refresh_token.is_empty() => "expired (no refresh token)".to_string(),
        Ok(true) => "expired (will refresh on next request)".to_string(),
        Err(e) => format!("unreadable ({})", e),
    };

    println!("host:  {}", creds.host);
    println!("user:  {}", creds.user);
    println!("token: {}", token_state);
    Ok(())
}

// ── Sync ────────────────────────────────────────────────────────────

pub fn cmd_sync(
    url: Option<String>,
    binary: Option<String>,
    output: PathBuf,
    host: Option<String>,
    profiles_dir: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    // Bad flag combinations fail before the network or the credential file
    let lookup = ApplicationLookup::from_inputs(url.as_deref(), binary.as_deref())
        .map_err(CliError::hub)?;

    let settings = load_settings()?;
    let profiles_dir = profiles_dir.unwrap_or_else(|| settings.profiles_dir.clone());

    let client = match host {
        Some(h) => HubClient::anonymous(&h, &settings),
        None => HubClient::with_store(Box::new(store()?), &settings),
    }
    .map_err(CliError::hub)?;

    let report = sync_profiles(&client, &lookup, &output, &profiles_dir).map_err(CliError::hub)?;
    log::info!(
        "synced {} profile(s) of application {} into {}",
        report.profiles.len(),
        report.application.id,
        output.display()
    );
    print_report(&report, json)
}

fn print_report(report: &SyncReport, json: bool) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    let app = &report.application;
    eprintln!("Application #{} {}", app.id, app.name);
    if report.profiles.is_empty() {
        eprintln!("  no analysis profiles");
    }
    for synced in &report.profiles {
        println!(
            "profile-{}\t{}\t{}",
            synced.profile.id,
            synced.profile.name,
            synced.path.display()
        );
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

fn store() -> Result<FileCredentialStore, CliError> {
    FileCredentialStore::default_location().map_err(CliError::hub)
}

fn load_settings() -> Result<Settings, CliError> {
    Settings::load().map_err(|e| CliError::hub(e).with_hint("check ~/.config/hubsync/settings.json"))
}
