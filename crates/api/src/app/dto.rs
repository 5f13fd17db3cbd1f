use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}
