use anyhow::Result;
use url::Url;

pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

pub fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("未提供任何URL。请通过命令行参数或文件提供至少一个URL。");
    }
    if let Some(bad) = urls.iter().find(|u| !is_valid_url(u)) {
        anyhow::bail!("无效的URL: {}", bad);
    }
    Ok(())
}

pub fn validate_output_dir(path: &str) -> Result<()> {
    if path.is_empty() {
        anyhow::bail!("输出路径不能为空");
    }
    Ok(())
}
