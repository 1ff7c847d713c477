//! Constants shared between the gate and the HTTP surface.

/// API version segment used in route prefixes.
pub const API_VERSION: &str = "v1";

/// Prefix for every JSON API route.
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying an explicitly requested organization id.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Query parameter used to carry the original path through the login redirect.
pub const NEXT_QUERY_PARAM: &str = "next";

/// Default cookie names used by the hosted auth provider.
pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";
pub const DEFAULT_REFRESH_COOKIE: &str = "sb-refresh-token";

/// JWT audience issued to signed-in users by the hosted auth provider.
pub const DEFAULT_JWT_AUDIENCE: &str = "authenticated";

/// Maximum number of audit entries returned by a single listing call.
pub const MAX_AUDIT_PAGE_SIZE: i64 = 200;
