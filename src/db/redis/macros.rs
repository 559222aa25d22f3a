/// Read-through caching over a [`Cache`](crate::db::Cache).
///
/// Evaluates to the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for caching with `$ttl` seconds and evaluates
/// to it. Errors from the cache read or from `$block` propagate with `?`, so
/// the macro can only be used inside a function returning `AppResult`.
///
/// ```rust,ignore
/// let movie: Movie = cached!(cache, CacheKey::Movie(id), MOVIE_CACHE_TTL, async {
///     catalog.get_movie(id).await?.ok_or_else(|| AppError::NotFound(id.to_string()))
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => hit,
            None => {
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                value
            }
        }
    }};
}
