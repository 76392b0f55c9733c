// Home and room listing endpoints
//
// The hierarchy is walked top-down: homes, then rooms per home. Device
// listings live in `devices.rs`.

use secrecy::SecretString;
use tracing::debug;

use crate::client::LviClient;
use crate::error::Error;
use crate::models::{HomeListData, LviHome, LviRoom, RoomListData};

impl LviClient {
    /// List all homes visible to the account.
    ///
    /// `POST uds/selectHomeList`
    pub async fn list_homes(&self, access_token: &SecretString) -> Result<Vec<LviHome>, Error> {
        let url = self.endpoint("uds/selectHomeList")?;
        debug!("listing homes");
        let data: HomeListData = self.post_authorized(url, access_token).await?;
        Ok(data.homes)
    }

    /// List the rooms of one home.
    ///
    /// `POST uds/selectRoombyHome2020?homeId=..`
    pub async fn list_rooms(
        &self,
        access_token: &SecretString,
        home_id: &str,
    ) -> Result<Vec<LviRoom>, Error> {
        let url = self.endpoint_with_query("uds/selectRoombyHome2020", &[("homeId", home_id)])?;
        debug!(home_id, "listing rooms");
        let data: RoomListData = self.post_authorized(url, access_token).await?;
        Ok(data.rooms)
    }
}
