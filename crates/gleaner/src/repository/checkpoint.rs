use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::entity::subscription::{self, Entity as Subscription};
use crate::entity::user::{self, Entity as User};
use crate::sync::{TargetKind, epoch};

use super::errors::Result;

/// Move a target's checkpoint forward to `at`.
///
/// The update only applies while the stored checkpoint is older than `at`,
/// so a slow pass finishing after a faster one can never move it backwards.
/// Returns whether a row changed.
pub async fn advance_checkpoint(
    db: &DatabaseConnection,
    kind: TargetKind,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool> {
    let at = at.fixed_offset();
    let result = match kind {
        TargetKind::Subscription => {
            Subscription::update_many()
                .col_expr(subscription::Column::Checkpoint, Expr::value(at))
                .filter(subscription::Column::Id.eq(id))
                .filter(subscription::Column::Checkpoint.lt(at))
                .exec(db)
                .await?
        }
        TargetKind::User => {
            User::update_many()
                .col_expr(user::Column::Checkpoint, Expr::value(at))
                .filter(user::Column::Id.eq(id))
                .filter(user::Column::Checkpoint.lt(at))
                .exec(db)
                .await?
        }
    };
    Ok(result.rows_affected > 0)
}

/// Set a target's checkpoint back to epoch, forcing a full rescan.
///
/// Returns whether the target exists.
pub async fn reset_checkpoint(db: &DatabaseConnection, kind: TargetKind, id: Uuid) -> Result<bool> {
    let epoch = epoch().fixed_offset();
    let result = match kind {
        TargetKind::Subscription => {
            Subscription::update_many()
                .col_expr(subscription::Column::Checkpoint, Expr::value(epoch))
                .filter(subscription::Column::Id.eq(id))
                .exec(db)
                .await?
        }
        TargetKind::User => {
            User::update_many()
                .col_expr(user::Column::Checkpoint, Expr::value(epoch))
                .filter(user::Column::Id.eq(id))
                .exec(db)
                .await?
        }
    };
    Ok(result.rows_affected > 0)
}
