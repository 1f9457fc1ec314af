// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! New Strava activity: add a page to every bound database.

use super::{open_binding, prepare_account, ActionContext, RunOutcome};
use crate::error::Result;
use crate::models::DestinationBinding;
use crate::services::mapper::PropertyMap;
use crate::services::notion::Page;

async fn create_page(
    context: &ActionContext,
    binding: &DestinationBinding,
    properties: &PropertyMap,
) -> Result<Page> {
    let (notion, database_id) = open_binding(context, binding).await?;
    notion.create_page(database_id, properties).await
}

pub(super) async fn run(context: &ActionContext) -> Result<RunOutcome> {
    let accounts = context.store.get_linked_accounts(&context.owner_id).await?;
    let mut lines = Vec::new();

    for user_email in &accounts {
        let account = prepare_account(context, user_email).await?;

        for binding in &account.bindings {
            match create_page(context, binding, &account.properties).await {
                Ok(page) => {
                    tracing::info!(
                        activity_id = %context.object_id,
                        bot_id = %binding.bot_id,
                        page_id = %page.id,
                        "Created activity page"
                    );
                    lines.push(format!(
                        "page {} created for bot_id {}, account {}",
                        page.id, binding.bot_id, account.user_email
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        activity_id = %context.object_id,
                        bot_id = %binding.bot_id,
                        error = %e,
                        "Failed to create activity page"
                    );
                    lines.push(format!(
                        "add activity {} to bot_id {} account {} failed because: {}",
                        context.object_id, binding.bot_id, account.user_email, e
                    ));
                }
            }
        }
    }

    Ok(RunOutcome::ok(lines))
}
