/// Read-through caching over `Cache`.
///
/// Returns the cached value when present. Otherwise awaits `$block`, hands the
/// result to the background cache writer and returns it.
///
/// # Arguments
/// * `$cache`: anything with `get_from_cache` and `set_in_background`.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live in seconds.
/// * `$block`: a future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let videos: Vec<Video> = cached!(cache, CacheKey::Videos, CATALOG_TTL, async {
///     store.list_videos().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
