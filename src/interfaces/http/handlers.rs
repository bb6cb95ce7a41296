use super::AppState;
use super::IDEMPOTENCY_HEADER;
use super::dto::{
    CreateTransferRequest, CreateUserRequest, CreateUserResponse, DepositRequest,
    TransferResponse, WalletResponse,
};
use super::error::ApiError;
use crate::domain::transfer::{IdempotencyKey, TransferId};
use crate::domain::wallet::WalletId;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};

type ApiResult<T> = Result<T, ApiError>;

pub async fn create_user(
    State(engine): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let Json(body) = body?;
    let created = engine.create_user_and_wallet(body.into_new_user()?).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn deposit(
    State(engine): State<AppState>,
    wallet_id: Result<Path<WalletId>, PathRejection>,
    body: Result<Json<DepositRequest>, JsonRejection>,
) -> ApiResult<Json<WalletResponse>> {
    let Path(wallet_id) = wallet_id?;
    let Json(body) = body?;
    let wallet = engine.deposit(wallet_id, body.amount()?).await?;
    Ok(Json(wallet.into()))
}

pub async fn get_wallet(
    State(engine): State<AppState>,
    wallet_id: Result<Path<WalletId>, PathRejection>,
) -> ApiResult<Json<WalletResponse>> {
    let Path(wallet_id) = wallet_id?;
    Ok(Json(engine.get_wallet(wallet_id).await?.into()))
}

pub async fn create_transfer(
    State(engine): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransferResponse>)> {
    let Json(body) = body?;
    let request = body.into_request()?;
    let key = idempotency_key(&headers)?;

    let transfer = engine.transfer(request, key).await?;
    Ok((StatusCode::CREATED, Json(transfer.into())))
}

pub async fn get_transfer(
    State(engine): State<AppState>,
    transfer_id: Result<Path<TransferId>, PathRejection>,
) -> ApiResult<Json<TransferResponse>> {
    let Path(transfer_id) = transfer_id?;
    Ok(Json(engine.get_transfer(transfer_id).await?.into()))
}

fn idempotency_key(headers: &HeaderMap) -> ApiResult<IdempotencyKey> {
    let missing = || ApiError::bad_request(format!("{IDEMPOTENCY_HEADER} header is required"));
    let value = headers.get(IDEMPOTENCY_HEADER).ok_or_else(missing)?;
    let value = value.to_str().map_err(|_| {
        ApiError::bad_request(format!("{IDEMPOTENCY_HEADER} header must be visible ASCII"))
    })?;
    if value.trim().is_empty() {
        return Err(missing());
    }
    Ok(IdempotencyKey::new(value)?)
}
