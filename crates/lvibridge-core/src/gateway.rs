// ── Vendor gateway ──
//
// The seam between the core and the vendor HTTP client. The router,
// session manager and registry only talk to `VendorGateway`; the
// production implementation is `LviClient`, tests plug in fakes.

use std::future::Future;

use lvibridge_api::{DeviceControl, LviClient};
use secrecy::SecretString;

use crate::error::CoreError;
use crate::model::{Device, Home, Room};
use crate::session::Credentials;

/// An access/refresh token pair with absolute expiries (epoch ms).
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expire_at: i64,
    pub refresh_expire_at: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expire_at", &self.expire_at)
            .field("refresh_expire_at", &self.refresh_expire_at)
            .finish_non_exhaustive()
    }
}

/// Calls the core needs from the vendor API.
pub trait VendorGateway: Send + Sync {
    /// Step one of login: credentials for an authorization code.
    fn authorize(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// Step two of login: authorization code for a token pair.
    fn exchange(
        &self,
        authorization_code: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<TokenGrant, CoreError>> + Send;

    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenGrant, CoreError>> + Send;

    fn list_homes(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<Home>, CoreError>> + Send;

    fn list_rooms(
        &self,
        access_token: &str,
        home_id: &str,
    ) -> impl Future<Output = Result<Vec<Room>, CoreError>> + Send;

    /// Devices of one room, placed in `home_id` / `room_id`.
    fn list_room_devices(
        &self,
        access_token: &str,
        home_id: &str,
        room_id: &str,
    ) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;

    /// Devices of a home that belong to no room.
    fn list_independent_devices(
        &self,
        access_token: &str,
        home_id: &str,
    ) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;

    /// Hold `temp` (whole degrees, as sent on the wire) on a device.
    fn set_temperature(
        &self,
        access_token: &str,
        device_id: &str,
        temp: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

fn secret(token: &str) -> SecretString {
    SecretString::from(token.to_owned())
}

impl VendorGateway for LviClient {
    async fn authorize(&self, credentials: &Credentials) -> Result<String, CoreError> {
        Ok(self
            .request_authorization_code(
                &credentials.username,
                &credentials.password,
                &credentials.secret_token,
                &credentials.access_key,
            )
            .await?)
    }

    async fn exchange(
        &self,
        authorization_code: &str,
        credentials: &Credentials,
    ) -> Result<TokenGrant, CoreError> {
        let tokens = self
            .apply_access_token(
                authorization_code,
                &credentials.username,
                &credentials.password,
            )
            .await?;
        Ok(TokenGrant {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expire_at: tokens.expire_time,
            refresh_expire_at: tokens.refresh_expire_time,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError> {
        let tokens = self.refresh_token(&secret(refresh_token)).await?;
        Ok(TokenGrant {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expire_at: tokens.expire_time,
            refresh_expire_at: tokens.refresh_expire_time,
        })
    }

    async fn list_homes(&self, access_token: &str) -> Result<Vec<Home>, CoreError> {
        let homes = LviClient::list_homes(self, &secret(access_token)).await?;
        Ok(homes.into_iter().map(Home::from).collect())
    }

    async fn list_rooms(&self, access_token: &str, home_id: &str) -> Result<Vec<Room>, CoreError> {
        let rooms = LviClient::list_rooms(self, &secret(access_token), home_id).await?;
        Ok(rooms
            .into_iter()
            .map(|r| Room::from_api(r, home_id))
            .collect())
    }

    async fn list_room_devices(
        &self,
        access_token: &str,
        home_id: &str,
        room_id: &str,
    ) -> Result<Vec<Device>, CoreError> {
        let devices = LviClient::list_room_devices(self, &secret(access_token), room_id).await?;
        Ok(devices
            .into_iter()
            .map(|d| Device::from(d).placed(home_id, Some(room_id)))
            .collect())
    }

    async fn list_independent_devices(
        &self,
        access_token: &str,
        home_id: &str,
    ) -> Result<Vec<Device>, CoreError> {
        let devices =
            LviClient::list_independent_devices(self, &secret(access_token), home_id).await?;
        Ok(devices
            .into_iter()
            .map(|d| Device::from(d).placed(home_id, None))
            .collect())
    }

    async fn set_temperature(
        &self,
        access_token: &str,
        device_id: &str,
        temp: &str,
    ) -> Result<(), CoreError> {
        self.control_device(&secret(access_token), &DeviceControl::setpoint(device_id, temp))
            .await?;
        Ok(())
    }
}
