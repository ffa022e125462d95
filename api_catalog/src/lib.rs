use actix_web::web;

pub mod routes {
    pub mod category;
    pub mod product;
    pub mod upload;
}
pub mod services {
    pub mod reader;
    pub mod upload;
    pub mod writer;
}
pub mod dtos {
    pub mod category;
    pub mod product;
}

/// Public catalog browsing.
pub fn mount_catalog() -> actix_web::Scope {
    web::scope("/catalog")
        .service(routes::category::get_categories)
        .service(routes::product::get_products)
        .service(routes::product::get_product)
}

/// Catalog management, mounted behind the auth middleware.
pub fn mount_catalog_admin() -> actix_web::Scope {
    web::scope("/catalog")
        .service(routes::product::post_product)
        .service(routes::category::post_category)
        .service(routes::upload::post_upload)
}
