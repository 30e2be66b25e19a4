use sqlx::FromRow;

/// Postal address owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

/// User aggregate as stored. `password_hash` never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub address: Option<Address>,
}

/// Everything needed to insert a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub address: Option<Address>,
}

impl NewUser {
    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            active: true,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            image: self.image,
            bio: self.bio,
            address: self.address,
        }
    }
}

/// `users LEFT JOIN addresses` row.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_postal_code: Option<String>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        // addresses columns are NOT NULL, so line1 present means the join hit
        let address = match (
            r.address_line1,
            r.address_city,
            r.address_state,
            r.address_country,
            r.address_postal_code,
        ) {
            (Some(line1), Some(city), Some(state), Some(country), Some(postal_code)) => {
                Some(Address {
                    line1,
                    line2: r.address_line2,
                    city,
                    state,
                    country,
                    postal_code,
                })
            }
            _ => None,
        };
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password_hash: r.password_hash,
            active: r.active,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            image: r.image,
            bio: r.bio,
            address,
        }
    }
}
