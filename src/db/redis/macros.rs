/// A macro to simplify read-through caching with Redis.
///
/// Returns the cached value when present. Otherwise awaits the provided
/// future, hands the result to the background writer, and returns it.
/// The key's generation is read before the future runs, so a value
/// computed from data that was invalidated meanwhile is never served.
///
/// # Arguments
/// * `$cache`: The cache instance. It must have `generation`,
///   `get_from_cache` and `set_in_background` methods.
/// * `$key`: The key to use for caching the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: The future to await if the value is not found in cache.
///
/// # Example
/// ```rust,ignore
/// let menu: RestaurantMenu = cached!(cache, CacheKey::Menu(tenant_id), 300, async move {
///     assemble_menu(&tenant).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let generation = $cache.generation(&key).await?;
        if let Some(cached) = $cache.get_from_cache(&key, generation).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, generation, &value, $ttl);
            Ok(value)
        }
    }};
}
