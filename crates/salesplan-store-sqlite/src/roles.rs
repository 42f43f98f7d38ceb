//! [`RoleStore`] for [`SqliteStore`].

use std::collections::BTreeMap;

use rusqlite::OptionalExtension as _;

use salesplan_core::{roles::RoleSet, store::RoleStore};

use crate::{
  Error, Result,
  encode::{RawRoles, encode_dt, now},
  store::SqliteStore,
};

impl RoleStore for SqliteStore {
  type Error = Error;

  async fn get_roles<'a>(&'a self, user: &'a str) -> Result<Option<RoleSet>> {
    let user = user.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_email, input_user, reviewer, admin
               FROM user_roles WHERE user_email = ?1",
              rusqlite::params![user],
              RawRoles::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(|r| r.into_roles().1))
  }

  async fn list_roles(&self) -> Result<BTreeMap<String, RoleSet>> {
    let raw = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT user_email, input_user, reviewer, admin
           FROM user_roles ORDER BY user_email",
        )?;
        let rows = stmt
          .query_map([], RawRoles::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raw.into_iter().map(RawRoles::into_roles).collect())
  }

  async fn set_roles<'a>(&'a self, user: &'a str, roles: RoleSet) -> Result<()> {
    let user = user.to_owned();
    let ts_str = encode_dt(now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_roles (user_email, input_user, reviewer, admin, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (user_email) DO UPDATE SET
             input_user = excluded.input_user,
             reviewer   = excluded.reviewer,
             admin      = excluded.admin,
             updated_at = excluded.updated_at",
          rusqlite::params![user, roles.input_user, roles.reviewer, roles.admin, ts_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
