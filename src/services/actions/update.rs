// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Updated Strava activity: rewrite its pages, or create one if none exist.

use super::{open_binding, prepare_account, ActionContext, RunOutcome};
use crate::error::Result;
use crate::models::DestinationBinding;
use crate::services::mapper::PropertyMap;

/// Update every page of the activity in this binding's database. Duplicate
/// pages are all updated, never merged.
async fn update_pages(
    context: &ActionContext,
    binding: &DestinationBinding,
    properties: &PropertyMap,
) -> Result<Vec<String>> {
    let (notion, database_id) = open_binding(context, binding).await?;
    let page_ids = notion
        .find_activity_pages(database_id, &context.object_id)
        .await?;

    if page_ids.is_empty() {
        tracing::info!(
            activity_id = %context.object_id,
            database_id,
            "No page for updated activity, creating one"
        );
        let page = notion.create_page(database_id, properties).await?;
        return Ok(vec![page.id]);
    }

    let mut updated = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        notion.update_page_properties(&page_id, properties).await?;
        updated.push(page_id);
    }
    Ok(updated)
}

pub(super) async fn run(context: &ActionContext) -> Result<RunOutcome> {
    let accounts = context.store.get_linked_accounts(&context.owner_id).await?;
    let mut lines = Vec::new();

    for user_email in &accounts {
        let account = prepare_account(context, user_email).await?;

        for binding in &account.bindings {
            let database_id = binding.collection_id.as_deref().unwrap_or("<unset>");

            match update_pages(context, binding, &account.properties).await {
                Ok(page_ids) => {
                    tracing::info!(
                        activity_id = %context.object_id,
                        bot_id = %binding.bot_id,
                        pages = page_ids.len(),
                        "Updated activity pages"
                    );
                    lines.push(format!(
                        "page {} updated on database {}",
                        page_ids.join(", "),
                        database_id
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        activity_id = %context.object_id,
                        bot_id = %binding.bot_id,
                        error = %e,
                        "Failed to update activity pages"
                    );
                    lines.push(format!(
                        "failed to update page on database {} because {}",
                        database_id, e
                    ));
                }
            }
        }
    }

    Ok(RunOutcome::ok(lines))
}
