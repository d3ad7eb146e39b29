//! 商品 DAO - product 表

use rusqlite::{params, Connection, Row};

use super::{sql_limit, EntityDao};
use crate::error::Result;
use crate::storage::entities::Product;

const COLUMNS: &str =
    "id, name, description, price_cents, image_url, rating, review_count, created_at";

pub struct ProductDao<'a> {
    conn: &'a Connection,
}

impl<'a> ProductDao<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn upsert(&self, p: &Product) -> Result<()> {
        let sql = r#"
            INSERT INTO product (id, name, description, price_cents, image_url, rating, review_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                price_cents = excluded.price_cents,
                image_url = excluded.image_url,
                rating = excluded.rating,
                review_count = excluded.review_count,
                created_at = excluded.created_at
        "#;
        self.conn.execute(
            sql,
            params![
                p.id,
                p.name,
                p.description,
                p.price_cents,
                p.image_url,
                p.rating,
                p.review_count,
                p.created_at,
            ],
        )?;
        Ok(())
    }

    /// 最新的商品在前
    pub fn list(&self, limit: Option<u32>) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM product ORDER BY created_at DESC, id ASC LIMIT ?1",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![sql_limit(limit)], row_to_product)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM product WHERE id = ?1", COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], row_to_product)?;
        Ok(rows.next().transpose()?)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM product WHERE id = ?1", params![id])?)
    }

    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM product", [])?)
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM product", [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price_cents: row.get(3)?,
        image_url: row.get(4)?,
        rating: row.get(5)?,
        review_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl EntityDao for Product {
    fn upsert(conn: &Connection, record: &Self) -> Result<()> {
        ProductDao::new(conn).upsert(record)
    }

    fn list(conn: &Connection, limit: Option<u32>) -> Result<Vec<Self>> {
        ProductDao::new(conn).list(limit)
    }

    fn get_by_id(conn: &Connection, id: &String) -> Result<Option<Self>> {
        ProductDao::new(conn).get_by_id(id)
    }

    fn delete_by_id(conn: &Connection, id: &String) -> Result<usize> {
        ProductDao::new(conn).delete_by_id(id)
    }

    fn delete_all(conn: &Connection) -> Result<usize> {
        ProductDao::new(conn).delete_all()
    }

    fn count(conn: &Connection) -> Result<u64> {
        ProductDao::new(conn).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrate::init_db;

    fn open() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();
        conn
    }

    fn product(id: &str, created_at: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("product {}", id),
            description: "desc".to_string(),
            price_cents: 1999,
            image_url: format!("https://img.example.com/{}.png", id),
            rating: 4.5,
            review_count: 12,
            created_at,
        }
    }

    #[test]
    fn test_list_is_newest_first_and_limited() {
        let conn = open();
        let dao = ProductDao::new(&conn);
        dao.upsert(&product("old", 100)).unwrap();
        dao.upsert(&product("new", 300)).unwrap();
        dao.upsert(&product("mid", 200)).unwrap();

        let ids: Vec<String> = dao.list(None).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        let head = dao.list(Some(2)).unwrap();
        assert_eq!(head.len(), 2);
        assert_eq!(head[0].id, "new");
    }

    #[test]
    fn test_upsert_replaces_by_primary_key() {
        let conn = open();
        let dao = ProductDao::new(&conn);
        dao.upsert(&product("p1", 100)).unwrap();

        let mut changed = product("p1", 100);
        changed.price_cents = 2499;
        dao.upsert(&changed).unwrap();

        assert_eq!(dao.count().unwrap(), 1);
        assert_eq!(dao.get_by_id("p1").unwrap(), Some(changed));
    }

    #[test]
    fn test_delete() {
        let conn = open();
        let dao = ProductDao::new(&conn);
        dao.upsert(&product("p1", 1)).unwrap();
        dao.upsert(&product("p2", 2)).unwrap();

        assert_eq!(dao.delete_by_id("p1").unwrap(), 1);
        assert_eq!(dao.delete_by_id("p1").unwrap(), 0);
        assert!(dao.get_by_id("p1").unwrap().is_none());
        assert_eq!(dao.delete_all().unwrap(), 1);
        assert_eq!(dao.count().unwrap(), 0);
    }
}
