//! In-memory stand-ins for Postgres and WhatsApp used by the service tests.

use std::sync::{
    Mutex,
    atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::{
    error::{AppError, Res},
    whatsapp::MessageSender,
};
use db::{
    dtos::{
        supplier::{SupplierCreateRequest, SupplierUpdateRequest},
        user::UserCreateRequest,
    },
    models::{supplier::Supplier, user::User, verification::VerificationCode},
};

use super::{directory::Directory, otp::CodeStore};

#[derive(Default)]
pub struct MemoryCodes {
    rows: Mutex<Vec<VerificationCode>>,
    last_id: AtomicI64,
}

impl MemoryCodes {
    pub fn count(&self, phone_number: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.phone_number == phone_number)
            .count()
    }
}

#[async_trait]
impl CodeStore for MemoryCodes {
    async fn insert_code(
        &self,
        phone_number: &str,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Res<VerificationCode> {
        let row = VerificationCode {
            id: self.last_id.fetch_add(1, Ordering::SeqCst) + 1,
            phone_number: phone_number.to_string(),
            code: code.to_string(),
            created_at,
            expires_at,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn latest_code(&self, phone_number: &str) -> Res<Option<VerificationCode>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.phone_number == phone_number)
            .max_by_key(|r| (r.created_at, r.id))
            .cloned())
    }

    async fn delete_code(&self, code_id: i64) -> Res<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != code_id);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_codes(&self, phone_number: &str) -> Res<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.phone_number != phone_number);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_expired(&self, phone_number: Option<&str>, now: DateTime<Utc>) -> Res<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.expires_at > now || phone_number.is_some_and(|p| p != r.phone_number));
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, body: &str, recipient_phone: &str) -> Res<()> {
        if self.fail {
            return Err(AppError::Upstream("whatsapp unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((body.to_string(), recipient_phone.to_string()));
        Ok(())
    }
}

/// Mirrors the unique keys of `users.username`, `suppliers.user_id` and
/// `suppliers.phone_number`.
#[derive(Default)]
pub struct MemoryDirectory {
    pub users: Mutex<Vec<User>>,
    pub suppliers: Mutex<Vec<Supplier>>,
}

impl MemoryDirectory {
    pub fn supplier(&self, phone_number: &str) -> Option<Supplier> {
        self.suppliers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.phone_number == phone_number)
            .cloned()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, username: &str) -> Res<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn upsert_user(&self, data: UserCreateRequest) -> Res<User> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == data.username) {
            user.roles.extend(data.roles);
            user.roles.sort();
            user.roles.dedup();
            return Ok(user.clone());
        }
        let user = User {
            id: users.len() as i64 + 1,
            username: data.username,
            password_hash: data.password_hash,
            roles: data.roles,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn insert_supplier(&self, data: SupplierCreateRequest) -> Res<Supplier> {
        let mut suppliers = self.suppliers.lock().unwrap();
        if let Some(existing) = suppliers.iter().find(|s| s.user_id == data.user_id) {
            return Ok(existing.clone());
        }
        if suppliers.iter().any(|s| s.phone_number == data.phone_number) {
            return Err(AppError::Conflict("suppliers_phone_number_key".to_string()));
        }
        let supplier = Supplier {
            id: suppliers.len() as i64 + 1,
            user_id: data.user_id,
            phone_number: data.phone_number,
            is_verified: false,
            name: data.name,
            market_id: None,
            place: None,
            row_name: None,
            categories: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn supplier_by_phone(&self, phone_number: &str) -> Res<Option<Supplier>> {
        Ok(self.supplier(phone_number))
    }

    async fn supplier_by_user(&self, user_id: i64) -> Res<Option<Supplier>> {
        Ok(self
            .suppliers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn mark_phone_verified(&self, phone_number: &str) -> Res<u64> {
        let mut matched = 0;
        for supplier in self.suppliers.lock().unwrap().iter_mut() {
            if supplier.phone_number == phone_number {
                supplier.is_verified = true;
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn update_supplier_details(
        &self,
        user_id: i64,
        data: SupplierUpdateRequest,
    ) -> Res<Option<Supplier>> {
        let mut suppliers = self.suppliers.lock().unwrap();
        let Some(supplier) = suppliers.iter_mut().find(|s| s.user_id == user_id) else {
            return Ok(None);
        };
        if data.market_id.is_some() {
            supplier.market_id = data.market_id;
        }
        if data.place.is_some() {
            supplier.place = data.place;
        }
        if data.row_name.is_some() {
            supplier.row_name = data.row_name;
        }
        if data.categories.is_some() {
            supplier.categories = data.categories;
        }
        Ok(Some(supplier.clone()))
    }
}
