//! Gameroom rows.
//!
//! A gameroom row stores member ids and the attached game id; the domain
//! [`Gameroom`] is assembled by loading the member users (in insertion
//! order) and the game. Saving a gameroom reconciles each member's
//! `current_gameroom_id` pointer so the no-double-membership invariant holds
//! without a separate bookkeeping path.

use super::{key_for, Session, TreeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tuicub::error::Error;
use tuicub::gameroom::{Gameroom, GameroomStatus};
use tuicub::user::User;
use uuid::Uuid;

/// The persisted shape of a gameroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameroomRecord {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub status: GameroomStatus,
    pub created_at: DateTime<Utc>,
    pub user_ids: Vec<Uuid>,
    pub game_id: Option<Uuid>,
}

impl Session {
    /// All gamerooms that have not been deleted, oldest first.
    pub fn get_gamerooms(&self) -> Result<Vec<Gameroom>, Error> {
        let mut gamerooms = Vec::new();
        for entry in self.store.tree(TreeKind::Gamerooms).iter() {
            let (_, bytes) = entry.map_err(super::internal)?;
            let record: GameroomRecord =
                serde_json::from_slice(&bytes).map_err(super::internal)?;
            if record.status == GameroomStatus::Deleted {
                continue;
            }
            gamerooms.push(self.assemble_gameroom(record)?);
        }
        gamerooms.sort_by_key(|gameroom| gameroom.created_at);
        Ok(gamerooms)
    }

    /// Loads a gameroom under its row lock, for mutation. Deleted gamerooms
    /// are indistinguishable from missing ones.
    pub async fn get_gameroom_by_id(&mut self, id: Uuid) -> Result<Gameroom, Error> {
        self.lock_row(id).await?;
        self.get_gameroom_unlocked(id)
    }

    /// Loads a gameroom without locking, for read-only paths.
    pub fn get_gameroom_unlocked(&self, id: Uuid) -> Result<Gameroom, Error> {
        let record: GameroomRecord = self
            .read_json(TreeKind::Gamerooms, &key_for(id))?
            .ok_or(Error::NotFound)?;
        if record.status == GameroomStatus::Deleted {
            return Err(Error::NotFound);
        }
        self.assemble_gameroom(record)
    }

    /// Saves a gameroom and reconciles its members' membership pointers:
    /// current members point at this gameroom, members removed since the
    /// committed state point nowhere.
    pub fn save_gameroom(&mut self, gameroom: &Gameroom) -> Result<(), Error> {
        let previous: Option<GameroomRecord> =
            self.read_json(TreeKind::Gamerooms, &key_for(gameroom.id))?;

        let record = GameroomRecord {
            id: gameroom.id,
            name: gameroom.name.clone(),
            owner_id: gameroom.owner_id,
            status: gameroom.status,
            created_at: gameroom.created_at,
            user_ids: gameroom.users.iter().map(|user| user.id).collect(),
            game_id: gameroom.game.as_ref().map(|game| game.id),
        };

        for user in &gameroom.users {
            self.save_user(&User {
                current_gameroom_id: Some(gameroom.id),
                ..user.clone()
            })?;
        }
        if let Some(previous) = previous {
            self.clear_removed_members(&previous, &record.user_ids)?;
        }

        self.stage_put(TreeKind::Gamerooms, key_for(gameroom.id), &record)
    }

    /// Physically removes a gameroom row, clearing every member's pointer.
    pub fn delete_gameroom(&mut self, gameroom: &Gameroom) -> Result<(), Error> {
        if let Some(previous) =
            self.read_json::<GameroomRecord>(TreeKind::Gamerooms, &key_for(gameroom.id))?
        {
            self.clear_removed_members(&previous, &[])?;
        }
        self.stage_delete(TreeKind::Gamerooms, key_for(gameroom.id));
        Ok(())
    }

    fn clear_removed_members(
        &mut self,
        previous: &GameroomRecord,
        current_ids: &[Uuid],
    ) -> Result<(), Error> {
        for user_id in &previous.user_ids {
            if current_ids.contains(user_id) {
                continue;
            }
            if let Ok(user) = self.get_user_by_id(*user_id) {
                self.save_user(&User {
                    current_gameroom_id: None,
                    ..user
                })?;
            }
        }
        Ok(())
    }

    fn assemble_gameroom(&self, record: GameroomRecord) -> Result<Gameroom, Error> {
        let mut users = Vec::with_capacity(record.user_ids.len());
        for user_id in &record.user_ids {
            users.push(self.get_user_by_id(*user_id)?);
        }
        let game = match record.game_id {
            Some(game_id) => Some(self.get_game_unlocked(game_id)?),
            None => None,
        };
        Ok(Gameroom {
            id: record.id,
            name: record.name,
            owner_id: record.owner_id,
            users,
            created_at: record.created_at,
            game,
            status: record.status,
        })
    }
}
