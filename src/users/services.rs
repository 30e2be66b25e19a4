use time::Duration;
use tracing::{error, info, instrument};

use crate::{
    auth::{
        password::{hash_credential, verify_credential},
        Principal,
    },
    error::{ApiError, ValidationErrors},
    notify::passcode_message,
    passcodes::{generate_passcode, PASSCODE_TTL_MINUTES},
    state::AppState,
    users::{
        dto::{
            normalize_email, CreateUserRequest, CredentialUpdateRequest, ProfileUpdateRequest,
            UserView,
        },
        repo::{StoreError, UniqueField},
        repo_types::{Address, NewUser, User},
        validate,
    },
};

/// Outcome of an operation that (re)issues a bearer token alongside its body.
#[derive(Debug)]
pub struct Session<T> {
    pub token: Option<String>,
    pub body: T,
}

/// Looks up the user owning this exact username + credential pair.
async fn find_by_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    if username.is_empty() || password.is_empty() {
        return Ok(None);
    }
    let Some(user) = state.users.find_by_username(username).await? else {
        return Ok(None);
    };
    if verify_credential(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[instrument(skip(state, password))]
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Session<UserView>, ApiError> {
    let Some(user) = find_by_credentials(state, username.trim(), password).await? else {
        info!("login failed, invalid credentials");
        return Err(ApiError::Unauthorized);
    };
    info!(user_id = user.id, "login succeeded");
    Ok(Session {
        token: state.tokens.generate_token(user.id, &user.username),
        body: UserView::from(&user),
    })
}

#[instrument(skip(state, principal))]
pub async fn get_user(
    state: &AppState,
    principal: &Principal,
    id: i64,
) -> Result<Session<UserView>, ApiError> {
    let Some(user) = state.users.find_by_id(id).await? else {
        info!("fetch failed, user not found");
        return Err(ApiError::NotFound);
    };
    Ok(Session {
        token: state.tokens.renew_token(principal),
        body: UserView::from(&user),
    })
}

#[instrument(skip_all)]
pub async fn create_user(
    state: &AppState,
    input: Option<CreateUserRequest>,
) -> Result<Session<UserView>, ApiError> {
    let Some(mut input) = input else {
        info!("create failed, unreadable body");
        return Err(ApiError::BadRequest);
    };
    input.normalize();

    let mut errors = ValidationErrors::default();
    validate::new_account(&mut errors, &input);
    if !input.username.is_empty() && state.users.find_by_username(&input.username).await?.is_some()
    {
        errors.add(
            "username",
            format!("The provided username '{}' is not unique", input.username),
        );
    }
    if !input.email.is_empty() && state.users.find_by_email(&input.email).await?.is_some() {
        errors.add(
            "email",
            format!("The provided email '{}' is not unique", input.email),
        );
    }
    if !errors.is_empty() {
        info!(fields = ?errors.fields().collect::<Vec<_>>(), "create failed, validation");
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_credential(&input.password)?;
    let profile = input.profile;
    let user = state
        .users
        .create(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            image: profile.image,
            bio: profile.bio,
            address: profile.address.map(Address::from),
        })
        .await?;

    info!(user_id = user.id, "user created");
    Ok(Session {
        token: state.tokens.generate_token(user.id, &user.username),
        body: UserView::from(&user),
    })
}

#[instrument(skip(state, principal, input))]
pub async fn update_profile(
    state: &AppState,
    principal: &Principal,
    id: i64,
    input: Option<ProfileUpdateRequest>,
) -> Result<Session<()>, ApiError> {
    if !state.tokens.validate_token(Some(principal), id) {
        info!("profile update failed, not authorized");
        return Err(ApiError::Unauthorized);
    }
    let Some(mut input) = input else {
        info!("profile update failed, unreadable body");
        return Err(ApiError::BadRequest);
    };
    input.normalize();
    let mut errors = ValidationErrors::default();
    validate::profile(&mut errors, &input);
    errors.into_result()?;

    let Some(mut user) = state.users.find_by_id(id).await? else {
        info!("profile update failed, user not found");
        return Err(ApiError::NotFound);
    };
    input.apply_to(&mut user);
    state.users.update(&user).await.map_err(|e| {
        error!(error = %e, "profile update failed, store rejected write");
        ApiError::from(e)
    })?;

    info!("profile updated");
    Ok(Session {
        token: state.tokens.renew_token(principal),
        body: (),
    })
}

#[instrument(skip(state, principal, input))]
pub async fn update_credentials(
    state: &AppState,
    principal: &Principal,
    id: i64,
    input: Option<CredentialUpdateRequest>,
) -> Result<Session<()>, ApiError> {
    if !state.tokens.validate_token(Some(principal), id) {
        info!("credential update failed, not authorized");
        return Err(ApiError::Unauthorized);
    }
    let Some(input) = input else {
        info!("credential update failed, unreadable body");
        return Err(ApiError::BadRequest);
    };
    let Some(mut user) = state.users.find_by_id(id).await? else {
        info!("credential update failed, user not found");
        return Err(ApiError::NotFound);
    };

    // a live token is not enough here; the current secret must be re-proven
    let current = find_by_credentials(
        state,
        input.current_username.trim(),
        &input.current_password,
    )
    .await?;
    if current.map(|u| u.id) != Some(user.id) {
        info!("credential update failed, current credentials invalid");
        return Err(ApiError::Unauthorized);
    }

    let new_username = input.new_username().map(str::to_owned);
    let new_email = input.new_email();
    let mut errors = ValidationErrors::default();
    validate::credential_changes(&mut errors, &input);
    if let Some(name) = new_username.as_deref() {
        if name != user.username && state.users.find_by_username(name).await?.is_some() {
            errors.add(
                "newUsername",
                format!("The updated username '{name}' is not unique"),
            );
        }
    }
    if let Some(email) = new_email.as_deref() {
        if email != user.email && state.users.find_by_email(email).await?.is_some() {
            errors.add(
                "newEmail",
                format!("The updated email '{email}' is not unique"),
            );
        }
    }
    if !errors.is_empty() {
        info!(fields = ?errors.fields().collect::<Vec<_>>(), "credential update failed, validation");
        return Err(ApiError::Validation(errors));
    }

    if let Some(password) = input.new_password() {
        user.password_hash = hash_credential(password)?;
    }
    if let Some(email) = new_email {
        user.email = email;
    }
    if let Some(name) = new_username {
        user.username = name;
    }
    state.users.update(&user).await.map_err(|e| {
        error!(error = %e, "credential update failed, store rejected write");
        credential_write_error(e)
    })?;

    info!("credentials updated");
    // identity claims may have changed, so mint rather than renew
    Ok(Session {
        token: state.tokens.generate_token(user.id, &user.username),
        body: (),
    })
}

/// Same field names as the service-level uniqueness checks on this path.
fn credential_write_error(err: StoreError) -> ApiError {
    let StoreError::Conflict(field) = err else {
        return ApiError::from(err);
    };
    let (name, label) = match field {
        UniqueField::Username => ("newUsername", "username"),
        UniqueField::Email => ("newEmail", "email"),
    };
    let mut errors = ValidationErrors::default();
    errors.add(name, format!("The updated {label} is not unique"));
    ApiError::Validation(errors)
}

#[instrument(skip(state, principal))]
pub async fn delete_user(state: &AppState, principal: &Principal, id: i64) -> Result<(), ApiError> {
    if !state.tokens.validate_token(Some(principal), id) {
        info!("delete failed, not authorized");
        return Err(ApiError::Unauthorized);
    }
    if state.users.find_by_id(id).await?.is_none() {
        info!("delete failed, user not found");
        return Err(ApiError::NotFound);
    }
    if !state.users.delete(id).await? {
        // raced with another delete between lookup and write
        return Err(ApiError::NotFound);
    }
    info!("user deleted");
    Ok(())
}

/// Always `Ok` for unknown accounts so callers cannot probe for existence.
#[instrument(skip(state))]
pub async fn request_passcode(
    state: &AppState,
    username: &str,
    email: &str,
) -> Result<(), ApiError> {
    let username = username.trim();
    let email = normalize_email(email);
    if username.is_empty() && email.is_empty() {
        info!("passcode request failed, no identifier");
        return Err(ApiError::BadRequest);
    }

    let user = if !username.is_empty() {
        state.users.find_by_username(username).await?
    } else {
        state.users.find_by_email(&email).await?
    };
    let Some(user) = user else {
        info!("passcode request for unknown account ignored");
        return Ok(());
    };

    let code = generate_passcode();
    let expires_at = state.clock.now() + Duration::minutes(PASSCODE_TTL_MINUTES);
    state
        .passcodes
        .create(user.id, &code, expires_at)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = user.id, "passcode request failed, store rejected write");
            ApiError::Internal(e)
        })?;

    state.mailer.dispatch(
        &user.email,
        passcode_message(&user.username, &code, PASSCODE_TTL_MINUTES),
    );
    info!(user_id = user.id, "passcode issued");
    Ok(())
}

#[instrument(skip_all)]
pub async fn redeem_passcode(state: &AppState, code: &str) -> Result<Session<UserView>, ApiError> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    let Some(passcode) = state.passcodes.find_valid(&code, state.clock.now()).await? else {
        info!("passcode redemption failed, no live code");
        return Err(ApiError::Unauthorized);
    };
    let Some(user) = state.users.find_by_id(passcode.user_id).await? else {
        info!(user_id = passcode.user_id, "passcode redemption failed, owner gone");
        return Err(ApiError::Unauthorized);
    };
    info!(user_id = user.id, "passcode redeemed");
    Ok(Session {
        token: state.tokens.generate_token(user.id, &user.username),
        body: UserView::from(&user),
    })
}
