use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationErrors;
use crate::users::dto::{AddressDto, CreateUserRequest, CredentialUpdateRequest, ProfileFields};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9 ().\-]{5,18}[0-9]$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn check_len(errors: &mut ValidationErrors, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.add(
            field,
            format!("{field} must be between {min} and {max} characters"),
        );
    }
}

fn check_max(errors: &mut ValidationErrors, field: &str, value: Option<&str>, max: usize) {
    if let Some(v) = value {
        if v.chars().count() > max {
            errors.add(field, format!("{field} must be at most {max} characters"));
        }
    }
}

fn check_required(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.add(field, format!("{field} is required"));
    } else {
        check_max(errors, field, Some(value), max);
    }
}

fn check_username(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else {
        check_len(errors, field, value, 3, 50);
    }
}

fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else if !is_valid_email(value) {
        errors.add(field, format!("{field} is not a valid email address"));
    } else {
        check_max(errors, field, Some(value), 320);
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else {
        check_len(errors, field, value, 7, 50);
    }
}

fn check_address(errors: &mut ValidationErrors, a: &AddressDto) {
    check_required(errors, "address.addressLine1", &a.address_line1, 120);
    check_max(errors, "address.addressLine2", a.address_line2.as_deref(), 120);
    check_required(errors, "address.city", &a.city, 50);
    check_required(errors, "address.state", &a.state, 50);
    check_required(errors, "address.country", &a.country, 50);
    check_required(errors, "address.postalCode", &a.postal_code, 10);
}

/// Expects normalized input (blank optionals already `None`).
pub fn profile(errors: &mut ValidationErrors, p: &ProfileFields) {
    check_max(errors, "firstName", p.first_name.as_deref(), 50);
    check_max(errors, "lastName", p.last_name.as_deref(), 120);
    if let Some(phone) = p.phone.as_deref() {
        if !PHONE_RE.is_match(phone) {
            errors.add("phone", "phone is not a valid phone number");
        }
    }
    if let Some(image) = p.image.as_deref() {
        if !URL_RE.is_match(image) {
            errors.add("image", "image is not a valid URL");
        }
        check_max(errors, "image", Some(image), 240);
    }
    check_max(errors, "bio", p.bio.as_deref(), 1000);
    if let Some(address) = &p.address {
        check_address(errors, address);
    }
}

pub fn new_account(errors: &mut ValidationErrors, req: &CreateUserRequest) {
    check_username(errors, "username", &req.username);
    check_email(errors, "email", &req.email);
    check_password(errors, "password", &req.password);
    profile(errors, &req.profile);
}

/// Only the replacement values that were actually supplied are checked.
pub fn credential_changes(errors: &mut ValidationErrors, req: &CredentialUpdateRequest) {
    if let Some(username) = req.new_username() {
        check_username(errors, "newUsername", username);
    }
    if let Some(email) = req.new_email() {
        check_email(errors, "newEmail", &email);
    }
    if let Some(password) = req.new_password() {
        check_password(errors, "newPassword", password);
    }
}
