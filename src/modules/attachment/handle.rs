use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::attachment::{model::AttachmentResponse, service::AttachmentService},
};

#[post("")]
pub async fn upload_attachment(
    attachment_service: web::Data<AttachmentService>,
    mut payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<AttachmentResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let max_size = attachment_service.config().max_file_size;

    let mut field = payload
        .try_next()
        .await
        .map_err(|e| error::Error::bad_request(e.to_string()))?
        .ok_or_else(|| error::Error::bad_request("No file found in request"))?;

    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string)
        .ok_or_else(|| error::Error::bad_request("Missing filename"))?;
    let mime_type = field.content_type().map(|m| m.essence_str().to_string());

    let mut bytes = Vec::new();
    while let Some(chunk) =
        field.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
    {
        if bytes.len() + chunk.len() > max_size {
            return Err(error::Error::bad_request(format!(
                "File size exceeds maximum allowed size of {max_size} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    let attachment =
        attachment_service.upload(user_id, &filename, bytes, mime_type.as_deref()).await?;

    Ok(success::Success::created(Some(attachment)).message("File uploaded successfully"))
}

#[get("/{attachment_id}")]
pub async fn get_attachment(
    attachment_service: web::Data<AttachmentService>,
    attachment_id: web::Path<Uuid>,
) -> Result<success::Success<AttachmentResponse>, error::Error> {
    let attachment = attachment_service.get(*attachment_id).await?;
    Ok(success::Success::ok(Some(attachment)))
}

#[delete("/{attachment_id}")]
pub async fn delete_attachment(
    attachment_service: web::Data<AttachmentService>,
    attachment_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    attachment_service.delete(*attachment_id, user_id).await?;
    Ok(success::Success::no_content())
}

#[get("/{name}")]
pub async fn serve_upload(
    attachment_service: web::Data<AttachmentService>,
    name: web::Path<String>,
) -> Result<HttpResponse, error::Error> {
    let bytes = attachment_service.read_stored(&name).await?;
    let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();

    Ok(HttpResponse::Ok().content_type(mime.as_ref()).body(bytes))
}
