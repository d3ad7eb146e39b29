//! 地址 DAO - address 表

use rusqlite::{params, Connection, Row};

use super::{sql_limit, EntityDao};
use crate::error::Result;
use crate::storage::entities::Address;

const COLUMNS: &str = "id, full_name, phone, line1, line2, city, state, postal_code, country, is_default, created_at";

pub struct AddressDao<'a> {
    conn: &'a Connection,
}

impl<'a> AddressDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, a: &Address) -> Result<()> {
        let sql = r#"
            INSERT INTO address (id, full_name, phone, line1, line2, city, state, postal_code, country, is_default, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                full_name = excluded.full_name,
                phone = excluded.phone,
                line1 = excluded.line1,
                line2 = excluded.line2,
                city = excluded.city,
                state = excluded.state,
                postal_code = excluded.postal_code,
                country = excluded.country,
                is_default = excluded.is_default,
                created_at = excluded.created_at
        "#;
        self.conn.execute(
            sql,
            params![
                a.id,
                a.full_name,
                a.phone,
                a.line1,
                a.line2,
                a.city,
                a.state,
                a.postal_code,
                a.country,
                a.is_default as i32,
                a.created_at,
            ],
        )?;
        Ok(())
    }

    /// 默认地址在前，其余按创建时间倒序
    pub fn list(&self, limit: Option<u32>) -> Result<Vec<Address>> {
        let sql = format!(
            "SELECT {} FROM address ORDER BY is_default DESC, created_at DESC, id ASC LIMIT ?1",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![sql_limit(limit)], row_to_address)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Address>> {
        let sql = format!("SELECT {} FROM address WHERE id = ?1", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], row_to_address)?;
        Ok(rows.next().transpose()?)
    }

    /// 取消除 `keep_id` 以外所有地址的默认标记
    pub fn clear_default_except(&self, keep_id: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE address SET is_default = 0 WHERE is_default = 1 AND id <> ?1",
            params![keep_id],
        )?)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM address WHERE id = ?1", params![id])?)
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM address", [])?)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM address", [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

fn row_to_address(row: &Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        id: row.get(0)?,
        full_name: row.get(1)?,
        phone: row.get(2)?,
        line1: row.get(3)?,
        line2: row.get(4)?,
        city: row.get(5)?,
        state: row.get(6)?,
        postal_code: row.get(7)?,
        country: row.get(8)?,
        is_default: row.get::<_, i32>(9)? != 0,
        created_at: row.get(10)?,
    })
}

impl EntityDao for Address {
    fn upsert(conn: &Connection, record: &Self) -> Result<()> {
        AddressDao::new(conn).upsert(record)
    }

    fn list(conn: &Connection, limit: Option<u32>) -> Result<Vec<Self>> {
        AddressDao::new(conn).list(limit)
    }

    fn get_by_id(conn: &Connection, id: &String) -> Result<Option<Self>> {
        AddressDao::new(conn).get_by_id(id)
    }

    fn delete_by_id(conn: &Connection, id: &String) -> Result<usize> {
        AddressDao::new(conn).delete_by_id(id)
    }

    fn delete_all(conn: &Connection) -> Result<usize> {
        AddressDao::new(conn).delete_all()
    }

    fn count(conn: &Connection) -> Result<u64> {
        AddressDao::new(conn).count()
    }
}
