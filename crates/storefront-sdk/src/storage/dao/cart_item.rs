//! 购物车 DAO - cart_item 表（一个商品一行）

use rusqlite::{params, Connection, Row};

use super::{sql_limit, EntityDao};
use crate::error::Result;
use crate::storage::entities::CartItem;

const COLUMNS: &str = "product_id, name, price_cents, image_url, quantity, added_at";

pub struct CartItemDao<'a> {
    conn: &'a Connection,
}

impl<'a> CartItemDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 加入时间保留首次加入的值
    pub fn upsert(&self, item: &CartItem) -> Result<()> {
        let sql = r#"
            INSERT INTO cart_item (product_id, name, price_cents, image_url, quantity, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(product_id) DO UPDATE SET
                name = excluded.name,
                price_cents = excluded.price_cents,
                image_url = excluded.image_url,
                quantity = excluded.quantity
        "#;
        self.conn.execute(
            sql,
            params![
                item.product_id,
                item.name,
                item.price_cents,
                item.image_url,
                item.quantity,
                item.added_at,
            ],
        )?;
        Ok(())
    }

    pub fn list(&self, limit: Option<u32>) -> Result<Vec<CartItem>> {
        let sql = format!(
            "SELECT {} FROM cart_item ORDER BY added_at DESC, product_id ASC LIMIT ?1",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![sql_limit(limit)], row_to_cart_item)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_product_id(&self, product_id: &str) -> Result<Option<CartItem>> {
        let sql = format!("SELECT {} FROM cart_item WHERE product_id = ?1", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![product_id], row_to_cart_item)?;
        Ok(rows.next().transpose()?)
    }

    pub fn delete_by_product_id(&self, product_id: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM cart_item WHERE product_id = ?1",
            params![product_id],
        )?)
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM cart_item", [])?)
    }

    /// 行数（不是商品件数）
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cart_item", [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

fn row_to_cart_item(row: &Row<'_>) -> rusqlite::Result<CartItem> {
    Ok(CartItem {
        product_id: row.get(0)?,
        name: row.get(1)?,
        price_cents: row.get(2)?,
        image_url: row.get(3)?,
        quantity: row.get(4)?,
        added_at: row.get(5)?,
    })
}

impl EntityDao for CartItem {
    fn upsert(conn: &Connection, record: &Self) -> Result<()> {
        CartItemDao::new(conn).upsert(record)
    }

    fn list(conn: &Connection, limit: Option<u32>) -> Result<Vec<Self>> {
        CartItemDao::new(conn).list(limit)
    }

    fn get_by_id(conn: &Connection, id: &String) -> Result<Option<Self>> {
        CartItemDao::new(conn).get_by_product_id(id)
    }

    fn delete_by_id(conn: &Connection, id: &String) -> Result<usize> {
        CartItemDao::new(conn).delete_by_product_id(id)
    }

    fn delete_all(conn: &Connection) -> Result<usize> {
        CartItemDao::new(conn).delete_all()
    }

    fn count(conn: &Connection) -> Result<u64> {
        CartItemDao::new(conn).count()
    }
}
