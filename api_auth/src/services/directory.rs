use async_trait::async_trait;
use common::error::Res;
use db::{
    dtos::{
        supplier::{SupplierCreateRequest, SupplierUpdateRequest},
        user::UserCreateRequest,
    },
    models::{supplier::Supplier, user::User},
};
use sqlx::PgPool;

/// Users and suppliers as seen by the phone verification flows.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, username: &str) -> Res<Option<User>>;

    /// Get-or-create by username, merging roles into an existing row.
    async fn upsert_user(&self, data: UserCreateRequest) -> Res<User>;

    /// Returns this user's supplier row, creating it when missing.
    async fn insert_supplier(&self, data: SupplierCreateRequest) -> Res<Supplier>;

    async fn supplier_by_phone(&self, phone_number: &str) -> Res<Option<Supplier>>;

    async fn supplier_by_user(&self, user_id: i64) -> Res<Option<Supplier>>;

    /// Number of supplier rows matching the phone, verified before or not.
    async fn mark_phone_verified(&self, phone_number: &str) -> Res<u64>;

    /// `None` fields keep their stored value.
    async fn update_supplier_details(
        &self,
        user_id: i64,
        data: SupplierUpdateRequest,
    ) -> Res<Option<Supplier>>;
}

#[async_trait]
impl Directory for PgPool {
    async fn find_user(&self, username: &str) -> Res<Option<User>> {
        db::user::get_user_by_username(self, username).await
    }

    async fn upsert_user(&self, data: UserCreateRequest) -> Res<User> {
        db::user::upsert_user(self, data).await
    }

    async fn insert_supplier(&self, data: SupplierCreateRequest) -> Res<Supplier> {
        db::supplier::insert_supplier(self, data).await
    }

    async fn supplier_by_phone(&self, phone_number: &str) -> Res<Option<Supplier>> {
        db::supplier::get_supplier_by_phone(self, phone_number).await
    }

    async fn supplier_by_user(&self, user_id: i64) -> Res<Option<Supplier>> {
        db::supplier::get_supplier_by_user_id(self, user_id).await
    }

    async fn mark_phone_verified(&self, phone_number: &str) -> Res<u64> {
        db::supplier::mark_phone_verified(self, phone_number).await
    }

    async fn update_supplier_details(
        &self,
        user_id: i64,
        data: SupplierUpdateRequest,
    ) -> Res<Option<Supplier>> {
        db::supplier::update_supplier_details(self, user_id, data).await
    }
}
