//! Session and route guard commands.

use shopfront_client::api::LoginCredentials;
use shopfront_client::browser::Location;
use shopfront_client::token::TokenClaims;
use shopfront_client::{Navigation, Route, RouteMeta};
use shopfront_core::{Identity, Role};

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
fn print_identity(identity: &Identity) {
    println!("{} #{} ({})", identity.role, identity.id, identity.email);
    if !identity.name.is_empty() {
        println!("  name:   {}", identity.name);
    }
    if !identity.is_active {
        println!("  status: inactive");
    }
}

/// Log in and persist the credential.
///
/// # Errors
///
/// Returns `CliError::Login` if the server rejects the login.
pub async fn login(
    ctx: &Context,
    role: Role,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let credentials = LoginCredentials::new(email, password);
    let identity = ctx.session.login(&credentials, role).await?;
    print_identity(&identity);
    Ok(())
}

/// Log out. Always succeeds locally.
#[allow(clippy::print_stdout)]
pub async fn logout(ctx: &Context) {
    ctx.session.init_auth().await;
    ctx.session.logout().await;
    println!("Logged out");
}

/// Resolve the session from the environment and print who it belongs to.
#[allow(clippy::print_stdout)]
pub async fn whoami(ctx: &Context) {
    ctx.session.init_auth().await;

    match ctx.session.identity() {
        Some(identity) => {
            print_identity(&identity);
            let expires = ctx
                .session
                .credential()
                .and_then(|credential| TokenClaims::parse(&credential).ok())
                .and_then(|claims| claims.expires_at());
            if let Some(expires) = expires {
                println!("  expires: {expires}");
            }
        }
        None => println!("Not logged in"),
    }

    tracing::debug!(href = %ctx.location.href(), "Navigation URL after resolution");
}

/// Print the route guard's decision for a path.
#[allow(clippy::print_stdout)]
pub async fn navigate(ctx: &Context, path: String, requires_auth: bool, role: Option<Role>) {
    let route = Route {
        path,
        meta: RouteMeta {
            requires_auth: requires_auth || role.is_some(),
            role,
        },
    };

    match ctx.guard.before_each(&route).await {
        Navigation::Allow => println!("allow {}", route.path),
        Navigation::Redirect(target) => println!("redirect {} -> {target}", route.path),
    }
}
