//! Account commands - register, login, topup, balance, transfer

use anyhow::Result;
use serde_json::json;

use super::{get_context, read_password, require_caller};
use crate::output;

pub fn register(username: &str, with_password: bool, json: bool) -> Result<()> {
    let password = if with_password { Some(read_password(true)?) } else { None };

    let ctx = get_context()?;
    let registered = ctx.account_service.register(username, password.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registered)?);
        return Ok(());
    }

    output::success(&format!("Registered {} ({})", registered.username, registered.user_id));
    match &registered.token {
        Some(token) => println!("{}", token),
        None => output::warning("No session secret configured; set LEDGER_SESSION_SECRET to log in"),
    }
    Ok(())
}

pub fn login(username: &str, with_password: bool, json: bool) -> Result<()> {
    let password = if with_password { Some(read_password(false)?) } else { None };

    let ctx = get_context()?;
    let token = ctx.sessions()?.login(username, password.as_deref())?;

    if json {
        println!("{}", json!({ "token": token }));
    } else {
        println!("{}", token);
    }
    Ok(())
}

pub fn topup(token: Option<&str>, amount: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let amount = ctx.account_service.parse_amount(amount)?;

    ctx.account_service.topup_amount(&caller, amount)?;
    let balance = ctx.balance_service.get_balance(&caller)?;

    if json {
        println!("{}", json!({ "amount": amount.value(), "balance": balance }));
    } else {
        output::success(&format!("Topped up {}. Balance: {}", amount, balance));
    }
    Ok(())
}

pub fn balance(token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let balance = ctx.balance_service.get_balance(&caller)?;

    if json {
        println!("{}", json!({ "balance": balance }));
    } else {
        println!("{}", balance);
    }
    Ok(())
}

pub fn transfer(token: Option<&str>, to: &str, amount: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let caller = require_caller(&ctx, token)?;
    let amount = ctx.account_service.parse_amount(amount)?;

    let receipt = ctx.account_service.transfer_amount(&caller, to, amount)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        let balance = ctx.balance_service.get_balance(&caller)?;
        output::success(&format!("Sent {} to {}. Balance: {}", amount, to.trim(), balance));
    }
    Ok(())
}
