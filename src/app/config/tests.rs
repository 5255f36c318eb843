use crate::{
    ArcPath, ArcStr,
    app::config::{Config, PathOpt, StrOpt, USizeOpt, data::Data},
    fs::Fs,
    log::LogLevel,
};
use anyhow::Result;

#[tokio::test]
async fn test_mock_config_creation() {
    let config = Config::mock(Data::default());
    assert!(matches!(config, Config::Mock(_)));
}

#[tokio::test]
async fn test_actual_config_creation() {
    let fs = Fs::mock(Default::default());
    let path = ArcPath::from("test_config.toml");
    let config = Config::spawn(fs, path);
    assert!(matches!(config, Config::Actual(_)));
}

#[tokio::test]
async fn test_mock_path_operations() {
    let config = Config::mock(Data::default());

    let new_path = ArcPath::from("/custom/path");
    config.set_path(PathOpt::LogDir, new_path.clone()).await;
    let retrieved_path = config.path(PathOpt::LogDir).await;
    assert_eq!(retrieved_path, new_path);
}

#[tokio::test]
async fn test_mock_log_level_operations() {
    let config = Config::mock(Data::default());

    let default_level = config.log_level().await;
    assert_eq!(default_level, LogLevel::Warning);

    config.set_log_level(LogLevel::Info).await;
    let new_level = config.log_level().await;
    assert_eq!(new_level, LogLevel::Info);
}

#[tokio::test]
async fn test_mock_usize_operations() {
    let config = Config::mock(Data::default());

    let value = 1024;
    config.set_usize(USizeOpt::MaxAge, value).await;
    let retrieved_value = config.usize(USizeOpt::MaxAge).await;
    assert_eq!(retrieved_value, value);
}

#[tokio::test]
async fn test_mock_string_operations() {
    let config = Config::mock(Data::default());

    let url = ArcStr::from("http://localhost:3001");
    config.set_string(StrOpt::BaseUrl, url.clone()).await;
    let retrieved = config.string(StrOpt::BaseUrl).await;
    assert_eq!(retrieved, url);
}

#[tokio::test]
async fn test_mock_config_load_save() -> Result<()> {
    let config = Config::mock(Data::default());

    // Load and save are no-ops that always succeed for mock
    config.load().await?;
    config.save().await?;
    Ok(())
}

#[tokio::test]
async fn test_actual_config_poll_interval_default() {
    let fs = Fs::mock(Default::default());
    let path = ArcPath::from("test_config.toml");
    let config = Config::spawn(fs, path);

    assert_eq!(config.usize(USizeOpt::PollInterval).await, 2);
}

#[tokio::test]
async fn test_config_round_trips_through_mock_fs() {
    let fs = Fs::mock(Default::default());
    let path = ArcPath::from("config.toml");

    let config = Config::spawn(fs.clone(), path.clone());
    config.set_usize(USizeOpt::PollInterval, 7).await;
    config.save().await.unwrap();

    let reloaded = Config::spawn(fs, path);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.usize(USizeOpt::PollInterval).await, 7);
}

#[tokio::test]
async fn test_actual_config_save_and_reload() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let config_path = temp_dir.path().join("config.toml");
    let config_path = ArcPath::from(&config_path);

    let fs = Fs::spawn();
    let config = Config::spawn(fs.clone(), config_path.clone());

    config
        .set_path(PathOpt::LogDir, ArcPath::from("/custom/logs"))
        .await;
    config.set_log_level(LogLevel::Info).await;
    config.set_usize(USizeOpt::MaxAge, 30).await;
    config
        .set_string(StrOpt::BaseUrl, ArcStr::from("http://localhost:3001"))
        .await;

    config.save().await?;

    // Read and verify the saved file
    let contents = tokio::fs::read_to_string(&config_path).await?;
    let saved_data: Data = toml::from_str(&contents)?;

    assert_eq!(
        saved_data.path(PathOpt::LogDir).to_str().unwrap(),
        "/custom/logs"
    );
    assert_eq!(saved_data.log_level(), LogLevel::Info);
    assert_eq!(saved_data.usize(USizeOpt::MaxAge), 30);
    assert_eq!(
        saved_data.string(StrOpt::BaseUrl).as_ref(),
        "http://localhost:3001"
    );

    // A fresh actor loads the same values back
    let reloaded = Config::spawn(fs.clone(), config_path.clone());
    reloaded.load().await?;
    assert_eq!(reloaded.log_level().await, LogLevel::Info);
    assert_eq!(reloaded.usize(USizeOpt::MaxAge).await, 30);

    fs.remove_file(config_path.clone()).await.ok();
    temp_dir.close()?;

    Ok(())
}
