//! Generate-secret command.

use gatekeep_gateway::auth::TokenIssuer;

use crate::ui;

/// Print a fresh signing secret.
pub fn run_generate_secret() {
    let secret = TokenIssuer::generate_hex_secret();
    ui::info("Set this as GATEKEEP_JWT_SECRET:");
    println!("{secret}");
}
