// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session commands.

use till_core::Token;

use super::Context;
use crate::error::Result;

pub fn login(ctx: &Context, access_token: String, refresh_token: String, expires_at: u64) -> Result<()> {
    ctx.tokens
        .set_session(Token::new(access_token, refresh_token, expires_at));
    println!("Session saved to {}", ctx.session.path().display());
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    if !ctx.tokens.has_session() {
        println!("No active session.");
        return Ok(());
    }
    ctx.tokens.clear();
    println!("Logged out.");
    Ok(())
}
