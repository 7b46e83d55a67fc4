use fake::{faker::name::en::Name, Dummy, Fake, Faker};
use sqlx::PgPool;

use crate::model::profile::{Profile, TABLE_NAME};

pub struct ProfileFactory<T: Clone> {
    modifier_one: fn(x: &Profile, ext: T) -> Profile,
}

impl<T: Clone> Default for ProfileFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ProfileFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &Profile, ext: T) -> Profile) {
        self.modifier_one = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<Profile> {
        let data = Faker.fake::<ProfileDummy>();
        let data = (self.modifier_one)(
            &Profile {
                id: data.id,
                name: data.name,
                user_id: data.user_id,
            },
            ext,
        );
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, user_id) VALUES ($1, $2, $3)",
            TABLE_NAME
        ))
        .bind(data.id)
        .bind(&data.name)
        .bind(data.user_id)
        .execute(db)
        .await?;
        Ok(data)
    }
}

#[derive(Debug, Dummy, Clone)]
struct ProfileDummy {
    #[dummy(faker = "1..1_000_000")]
    pub id: i32,
    #[dummy(faker = "Name()")]
    pub name: String,
    #[dummy(faker = "1..1_000_000")]
    pub user_id: Option<i32>,
}
