use serde::{Deserialize, Serialize};

/// Singleton row describing the provisioned clock channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub category_id: String,
    pub clock_in_channel_id: String,
    pub clock_in_interface_id: String,
    pub clock_out_channel_id: String,
    pub clock_out_interface_id: String,
    pub admin_channel_id: String,
    pub clock_in_role_id: String,
}

impl ChannelConfig {
    /// Parse the `key=value` pairs accepted by `channels --set`.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut category_id = None;
        let mut clock_in_channel_id = None;
        let mut clock_in_interface_id = None;
        let mut clock_out_channel_id = None;
        let mut clock_out_interface_id = None;
        let mut admin_channel_id = None;
        let mut clock_in_role_id = None;

        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected key=value, got '{pair}'"))?;
            let value = Some(value.trim().to_string());
            match key.trim() {
                "category" => category_id = value,
                "clock_in_channel" => clock_in_channel_id = value,
                "clock_in_interface" => clock_in_interface_id = value,
                "clock_out_channel" => clock_out_channel_id = value,
                "clock_out_interface" => clock_out_interface_id = value,
                "admin_channel" => admin_channel_id = value,
                "clock_in_role" => clock_in_role_id = value,
                other => return Err(format!("Unknown channel key '{other}'")),
            }
        }

        let require = |v: Option<String>, name: &str| {
            v.filter(|s| !s.is_empty())
                .ok_or_else(|| format!("Missing required key '{name}'"))
        };

        Ok(Self {
            category_id: require(category_id, "category")?,
            clock_in_channel_id: require(clock_in_channel_id, "clock_in_channel")?,
            clock_in_interface_id: require(clock_in_interface_id, "clock_in_interface")?,
            clock_out_channel_id: require(clock_out_channel_id, "clock_out_channel")?,
            clock_out_interface_id: require(clock_out_interface_id, "clock_out_interface")?,
            admin_channel_id: require(admin_channel_id, "admin_channel")?,
            clock_in_role_id: require(clock_in_role_id, "clock_in_role")?,
        })
    }
}
