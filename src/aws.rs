use aws_config::SdkConfig;

pub mod ec2;

/// Loads the shared SDK configuration, optionally pinned to a named
/// credentials profile. Region resolution happens separately so an explicit
/// override can take precedence over the profile's default.
pub async fn sdk_config(profile: Option<&str>) -> SdkConfig {
    match profile {
        Some(name) => aws_config::from_env().profile_name(name).load().await,
        None => aws_config::load_from_env().await,
    }
}
