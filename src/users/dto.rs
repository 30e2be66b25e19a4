use serde::{Deserialize, Serialize};

use crate::users::repo_types::{Address, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDto {
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
}

impl From<&Address> for AddressDto {
    fn from(a: &Address) -> Self {
        Self {
            address_line1: a.line1.clone(),
            address_line2: a.line2.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            country: a.country.clone(),
            postal_code: a.postal_code.clone(),
        }
    }
}

impl From<AddressDto> for Address {
    fn from(d: AddressDto) -> Self {
        Self {
            line1: d.address_line1,
            line2: d.address_line2.filter(|v| !v.trim().is_empty()),
            city: d.city,
            state: d.state,
            country: d.country,
            postal_code: d.postal_code,
        }
    }
}

/// Non-credential profile fields. The whole body of a profile update, and the
/// optional part of a registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub address: Option<AddressDto>,
}

impl ProfileFields {
    /// Blank strings count as "not supplied".
    pub fn normalize(&mut self) {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.phone,
            &mut self.image,
            &mut self.bio,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty());
        }
    }

    /// Overwrites the profile part of `user`; identity and credential stay put.
    pub fn apply_to(self, user: &mut User) {
        user.first_name = self.first_name;
        user.last_name = self.last_name;
        user.phone = self.phone;
        user.image = self.image;
        user.bio = self.bio;
        user.address = self.address.map(Address::from);
    }
}

pub type ProfileUpdateRequest = ProfileFields;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

impl CreateUserRequest {
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_owned();
        self.email = normalize_email(&self.email);
        self.profile.normalize();
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdateRequest {
    #[serde(default)]
    pub current_username: String,
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_username: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub new_email: Option<String>,
}

impl CredentialUpdateRequest {
    pub fn new_username(&self) -> Option<&str> {
        non_blank(self.new_username.as_deref())
    }

    /// Returned verbatim: the blank test trims, the credential itself never is.
    pub fn new_password(&self) -> Option<&str> {
        self.new_password
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }

    pub fn new_email(&self) -> Option<String> {
        non_blank(self.new_email.as_deref()).map(normalize_email)
    }
}

/// Sanitized user view: the credential has no field here at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub address: Option<AddressDto>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            active: u.active,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            phone: u.phone.clone(),
            image: u.image.clone(),
            bio: u.bio.clone(),
            address: u.address.as_ref().map(AddressDto::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasscodeRequestQuery {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasscodeRedeemQuery {
    #[serde(default)]
    pub passcode: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_reads_camel_case_and_flattened_profile() {
        let mut req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "username": " alice123 ",
            "email": "A@Example.com",
            "password": "secretpw",
            "firstName": "Alice",
            "address": {
                "addressLine1": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "country": "US",
                "postalCode": "62701"
            }
        }))
        .unwrap();
        req.normalize();
        assert_eq!(req.username, "alice123");
        assert_eq!(req.email, "a@example.com");
        assert_eq!(req.profile.first_name.as_deref(), Some("Alice"));
        assert_eq!(req.profile.address.unwrap().city, "Springfield");
    }

    #[test]
    fn view_never_serializes_a_credential() {
        let user = User {
            id: 1,
            username: "alice123".into(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            active: true,
            first_name: None,
            last_name: None,
            phone: None,
            image: None,
            bio: None,
            address: None,
        };
        let json = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(json.contains("\"username\":\"alice123\""));
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn blank_credential_changes_are_absent() {
        let req: CredentialUpdateRequest = serde_json::from_value(serde_json::json!({
            "currentUsername": "alice123",
            "currentPassword": "secretpw",
            "newUsername": "  ",
            "newEmail": " New@Example.com "
        }))
        .unwrap();
        assert_eq!(req.new_username(), None);
        assert_eq!(req.new_password(), None);
        assert_eq!(req.new_email().as_deref(), Some("new@example.com"));
    }

    #[test]
    fn new_password_keeps_surrounding_spaces() {
        let req: CredentialUpdateRequest = serde_json::from_value(serde_json::json!({
            "currentUsername": "alice123",
            "currentPassword": "secretpw",
            "newPassword": " brandnewpw "
        }))
        .unwrap();
        assert_eq!(req.new_password(), Some(" brandnewpw "));
    }
}
