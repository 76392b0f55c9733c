// Device endpoints: listing and control

use secrecy::SecretString;
use tracing::debug;

use crate::client::LviClient;
use crate::error::Error;
use crate::models::{DeviceControl, DeviceListData, LviDevice};

impl LviClient {
    /// List the heaters assigned to a room.
    ///
    /// `POST uds/selectDevicebyRoom2020?roomId=..`
    pub async fn list_room_devices(
        &self,
        access_token: &SecretString,
        room_id: &str,
    ) -> Result<Vec<LviDevice>, Error> {
        let url = self.endpoint_with_query("uds/selectDevicebyRoom2020", &[("roomId", room_id)])?;
        debug!(room_id, "listing room devices");
        let data: DeviceListData = self.post_authorized(url, access_token).await?;
        Ok(data.devices)
    }

    /// List the heaters of a home that are not assigned to any room.
    ///
    /// `POST uds/getIndependentDevices2020?homeId=..`
    pub async fn list_independent_devices(
        &self,
        access_token: &SecretString,
        home_id: &str,
    ) -> Result<Vec<LviDevice>, Error> {
        let url =
            self.endpoint_with_query("uds/getIndependentDevices2020", &[("homeId", home_id)])?;
        debug!(home_id, "listing independent devices");
        let data: DeviceListData = self.post_authorized(url, access_token).await?;
        Ok(data.devices)
    }

    /// Send a control command to a single heater.
    ///
    /// `POST uds/deviceControlForOpenApi?deviceId=..&holdTemp=..&operation=..&status=..`
    pub async fn control_device(
        &self,
        access_token: &SecretString,
        control: &DeviceControl,
    ) -> Result<(), Error> {
        let operation = control.operation.code().to_string();
        let status = control.status.to_string();
        let url = self.endpoint_with_query(
            "uds/deviceControlForOpenApi",
            &[
                ("deviceId", control.device_id.as_str()),
                ("holdTemp", control.hold_temp.as_str()),
                ("operation", operation.as_str()),
                ("status", status.as_str()),
            ],
        )?;
        debug!(
            device_id = %control.device_id,
            hold_temp = %control.hold_temp,
            operation = ?control.operation,
            "controlling device"
        );
        let _: serde_json::Value = self.post_authorized(url, access_token).await?;
        Ok(())
    }
}
