//! Persistence layer: one repository per entity over a shared pool

pub mod books;
pub mod transactions;
pub mod users;

use sqlx::{Pool, Postgres};

/// Per-entity repositories sharing one connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub books: books::BooksRepository,
    pub transactions: transactions::TransactionsRepository,
}

impl Repository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            transactions: transactions::TransactionsRepository::new(pool.clone()),
            pool,
        }
    }
}
