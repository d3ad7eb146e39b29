//! 数据访问层 (DAO) - 每张表一个专门的操作模块
//!
//! DAO 只在 DbActor 线程上被调用，所有方法都是同步的。

pub mod address;
pub mod cart_item;
pub mod product;

pub use address::AddressDao;
pub use cart_item::CartItemDao;
pub use product::ProductDao;

use rusqlite::Connection;

use crate::error::{Result, StorefrontSDKError};
use crate::storage::entities::Entity;

/// 本地表的通用操作，EntityStore 通过它对任意实体类型工作
pub trait EntityDao: Entity {
    fn upsert(conn: &Connection, record: &Self) -> Result<()>;

    /// 按领域顺序返回，`limit` 为 None 时返回全部
    fn list(conn: &Connection, limit: Option<u32>) -> Result<Vec<Self>>;

    fn get_by_id(conn: &Connection, id: &Self::Id) -> Result<Option<Self>>;

    fn delete_by_id(conn: &Connection, id: &Self::Id) -> Result<usize>;

    fn delete_all(conn: &Connection) -> Result<usize>;

    fn count(conn: &Connection) -> Result<u64>;
}

/// SQLite 的 LIMIT 用 -1 表示不限制
pub(crate) fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

/// 事务管理器 - 统一管理跨语句操作的事务
pub struct TransactionManager<'a> {
    conn: &'a Connection,
}

impl<'a> TransactionManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 执行事务操作；`f` 返回错误时整体回滚
    pub fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StorefrontSDKError::Database(format!("开始事务失败: {}", e)))?;

        let result = f(self.conn)?;

        tx.commit()
            .map_err(|e| StorefrontSDKError::Database(format!("提交事务失败: {}", e)))?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entities::Product;
    use crate::storage::migrate::init_db;

    fn product(id: &str, created_at: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("product {}", id),
            description: String::new(),
            price_cents: 100,
            image_url: String::new(),
            rating: 4.0,
            review_count: 1,
            created_at,
        }
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_db(&mut conn).unwrap();
        Product::upsert(&conn, &product("p1", 1)).unwrap();

        let result: Result<()> = TransactionManager::new(&conn).execute(|conn| {
            Product::delete_all(conn)?;
            Product::upsert(conn, &product("p2", 2))?;
            Err(StorefrontSDKError::Other("中途失败".to_string()))
        });
        assert!(result.is_err());

        let ids: Vec<String> = Product::list(&conn, None)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p1".to_string()]);
    }

    #[test]
    fn test_sql_limit() {
        assert_eq!(sql_limit(None), -1);
        assert_eq!(sql_limit(Some(5)), 5);
    }
}
