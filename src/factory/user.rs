use chrono::NaiveDateTime;
use fake::{
    faker::internet::en::{SafeEmail, Username},
    Dummy, Fake, Faker,
};
use sqlx::{Executor, PgPool, Postgres};

use crate::model::user::{User, TABLE_NAME};

pub struct UserFactory<T: Clone> {
    modifier_one: fn(x: &User, ext: T) -> User,
    modifier_many: fn(x: &User, idx: usize, ext: T) -> User,
}

impl<T: Clone> Default for UserFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> UserFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            // Random names can collide, which would plant duplicates nobody asked for.
            modifier_many: |x, idx, _| User {
                id: idx as i32 + 1,
                username: format!("{}_{}", x.username, idx),
                email: format!("{}.{}", idx, x.email),
                created_at: x.created_at,
            },
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &User, ext: T) -> User) {
        self.modifier_one = modifier
    }

    pub fn modified_many(&mut self, modifier: fn(x: &User, idx: usize, ext: T) -> User) {
        self.modifier_many = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<User> {
        let data = UserDummy::generate_one();
        let data = (self.modifier_one)(&data, ext);
        insert(db, &data).await?;
        Ok(data)
    }

    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<User>> {
        let data = UserDummy::generate_many(num);
        let mut result: Vec<User> = vec![];
        for (idx, item) in data.iter().enumerate() {
            result.push((self.modifier_many)(item, idx, ext.clone()));
        }
        let mut tx = db.begin().await?;
        for item in result.iter() {
            insert(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(result)
    }
}

async fn insert<'e, E>(db: E, user: &User) -> anyhow::Result<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(&format!(
        "INSERT INTO {} (id, username, email, created_at) VALUES ($1, $2, $3, $4)",
        TABLE_NAME
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.created_at)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, Dummy, Clone)]
struct UserDummy {
    #[dummy(faker = "1..1_000_000")]
    pub id: i32,
    #[dummy(faker = "Username()")]
    pub username: String,
    #[dummy(faker = "SafeEmail()")]
    pub email: String,
    pub created_at: Option<NaiveDateTime>,
}

impl UserDummy {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            created_at: self.created_at,
        }
    }

    pub fn generate_one() -> User {
        Faker.fake::<UserDummy>().into_user()
    }

    pub fn generate_many(num: u32) -> Vec<User> {
        (0..num)
            .map(|_| Faker.fake::<UserDummy>().into_user())
            .collect()
    }
}
