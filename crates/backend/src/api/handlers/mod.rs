// UseCase handlers
pub mod u601_upload_to_sheets;
