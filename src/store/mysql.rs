use crate::error::StoreError;
use crate::models::{Category, CategoryId, PostId, PostRecord, Profile, Tag, TagId};
use crate::store::{
    Audience, CategoryCountRow, CategoryWrite, ContentStore, PostFilter, PostJoinRow, PostKey,
    PostWrite, RowSet, SlugTable, TagWrite,
};
use chrono::NaiveDateTime;
use mysql::prelude::{FromValue, Queryable};
use mysql::{params, Opts, Pool, PooledConn, Row, TxOpts, Value};
use std::collections::HashMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const POST_COLUMNS: &str = "p.id, p.slug, p.title, p.excerpt, p.content, p.thumbnail, p.status, \
     p.seo_title, p.seo_description, p.views, p.author_id, \
     DATE_FORMAT(p.published_at, '%Y-%m-%d %H:%i:%s') AS published_at, \
     DATE_FORMAT(p.created_at, '%Y-%m-%d %H:%i:%s') AS created_at, \
     DATE_FORMAT(p.updated_at, '%Y-%m-%d %H:%i:%s') AS updated_at, \
     DATE_FORMAT(p.deleted_at, '%Y-%m-%d %H:%i:%s') AS deleted_at";

pub struct MySqlStore {
    pool: Pool,
}

impl MySqlStore {
    pub fn connect(db_url: &str) -> Result<Self, StoreError> {
        let opts = Opts::from_url(db_url).map_err(mysql::Error::UrlError)?;
        let pool = Pool::new(opts)?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConn, StoreError> {
        Ok(self.pool.get_conn()?)
    }

    /// Attaches categories, tags and authors to a page of posts.
    fn join(
        &self,
        conn: &mut PooledConn,
        posts: Vec<PostRecord>,
    ) -> Result<Vec<PostJoinRow>, StoreError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Value> = posts.iter().map(|p| Value::from(p.id)).collect();
        let marks = placeholders(ids.len());

        let mut categories: HashMap<PostId, Vec<Option<Category>>> = HashMap::new();
        let rows: Vec<Row> = conn.exec(
            format!(
                "SELECT pc.post_id, c.id, c.name, c.slug, c.description, c.color
                 FROM post_categories pc
                 LEFT JOIN categories c ON c.id = pc.category_id
                 WHERE pc.post_id IN ({})
                 ORDER BY pc.post_id, pc.category_id",
                marks
            ),
            ids.clone(),
        )?;
        for mut row in rows {
            let post_id: PostId = take(&mut row, "post_id")?;
            let category = match take::<Option<CategoryId>>(&mut row, "id")? {
                Some(id) => Some(category_from(&mut row, id)?),
                None => None,
            };
            categories.entry(post_id).or_default().push(category);
        }

        let mut tags: HashMap<PostId, Vec<Option<Tag>>> = HashMap::new();
        let rows: Vec<Row> = conn.exec(
            format!(
                "SELECT pt.post_id, t.id, t.name, t.slug
                 FROM post_tags pt
                 LEFT JOIN tags t ON t.id = pt.tag_id
                 WHERE pt.post_id IN ({})
                 ORDER BY pt.post_id, pt.tag_id",
                marks
            ),
            ids,
        )?;
        for mut row in rows {
            let post_id: PostId = take(&mut row, "post_id")?;
            let tag = match take::<Option<TagId>>(&mut row, "id")? {
                Some(id) => Some(Tag {
                    id,
                    name: take(&mut row, "name")?,
                    slug: take(&mut row, "slug")?,
                }),
                None => None,
            };
            tags.entry(post_id).or_default().push(tag);
        }

        let mut author_ids: Vec<Value> = posts
            .iter()
            .map(|p| Value::from(p.author_id.as_str()))
            .collect();
        author_ids.dedup();
        let rows: Vec<Row> = conn.exec(
            format!(
                "SELECT id, full_name, headline, bio, avatar_url FROM profiles WHERE id IN ({})",
                placeholders(author_ids.len())
            ),
            author_ids,
        )?;
        let authors: HashMap<String, Profile> = rows
            .into_iter()
            .map(profile_from)
            .map(|profile| profile.map(|p| (p.id.clone(), p)))
            .collect::<Result<_, _>>()?;

        Ok(posts
            .into_iter()
            .map(|post| PostJoinRow {
                categories: categories.remove(&post.id).unwrap_or_default(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                author: authors.get(&post.author_id).cloned(),
                post,
            })
            .collect())
    }

    fn exists(
        conn: &mut PooledConn,
        table: &'static str,
        id: u64,
        extra: &str,
    ) -> Result<bool, StoreError> {
        let count: Option<u64> = conn.exec_first(
            format!("SELECT COUNT(*) FROM {} WHERE id = ?{}", table, extra),
            (id,),
        )?;
        Ok(count.unwrap_or(0) > 0)
    }
}

fn check_ping(answer: Option<u8>) -> Result<(), StoreError> {
    match answer {
        Some(1) => Ok(()),
        other => Err(StoreError::Unavailable(format!(
            "unexpected reply to SELECT 1: {:?}",
            other
        ))),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `%term%` for `LIKE`, with the term's own wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn format_time(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn take<T: FromValue>(row: &mut Row, column: &'static str) -> Result<T, StoreError> {
    match row.take_opt(column) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(StoreError::Decode {
            column,
            reason: format!("cannot convert {:?}", e.0),
        }),
        None => Err(StoreError::Decode {
            column,
            reason: "missing from result".to_string(),
        }),
    }
}

fn take_time(row: &mut Row, column: &'static str) -> Result<Option<NaiveDateTime>, StoreError> {
    let raw: Option<String> = take(row, column)?;
    raw.map(|value| {
        NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(|e| StoreError::Decode {
            column,
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn take_required_time(row: &mut Row, column: &'static str) -> Result<NaiveDateTime, StoreError> {
    take_time(row, column)?.ok_or(StoreError::Decode {
        column,
        reason: "unexpected NULL".to_string(),
    })
}

fn post_from(mut row: Row) -> Result<PostRecord, StoreError> {
    let status: String = take(&mut row, "status")?;
    Ok(PostRecord {
        id: take(&mut row, "id")?,
        slug: take(&mut row, "slug")?,
        title: take(&mut row, "title")?,
        excerpt: take(&mut row, "excerpt")?,
        content: take(&mut row, "content")?,
        thumbnail: take(&mut row, "thumbnail")?,
        status: status.parse().map_err(|reason| StoreError::Decode {
            column: "status",
            reason,
        })?,
        seo_title: take(&mut row, "seo_title")?,
        seo_description: take(&mut row, "seo_description")?,
        views: take(&mut row, "views")?,
        author_id: take(&mut row, "author_id")?,
        published_at: take_time(&mut row, "published_at")?,
        created_at: take_required_time(&mut row, "created_at")?,
        updated_at: take_required_time(&mut row, "updated_at")?,
        deleted_at: take_time(&mut row, "deleted_at")?,
    })
}

fn category_from(row: &mut Row, id: CategoryId) -> Result<Category, StoreError> {
    Ok(Category {
        id,
        name: take(row, "name")?,
        slug: take(row, "slug")?,
        description: take(row, "description")?,
        color: take(row, "color")?,
        post_count: None,
    })
}

fn profile_from(mut row: Row) -> Result<Profile, StoreError> {
    Ok(Profile {
        id: take(&mut row, "id")?,
        full_name: take(&mut row, "full_name")?,
        headline: take(&mut row, "headline")?,
        bio: take(&mut row, "bio")?,
        avatar_url: take(&mut row, "avatar_url")?,
    })
}

/// `WHERE` body and positional parameters shared by the count and page queries.
fn post_conditions(filter: &PostFilter) -> (String, Vec<Value>) {
    let mut conditions = vec!["p.deleted_at IS NULL".to_string()];
    let mut params = Vec::new();

    if filter.audience == Audience::Public {
        conditions.push("p.status = 'published'".to_string());
    }
    if let Some(ids) = &filter.ids {
        if ids.is_empty() {
            conditions.push("FALSE".to_string());
        } else {
            conditions.push(format!("p.id IN ({})", placeholders(ids.len())));
            params.extend(ids.iter().map(|id| Value::from(*id)));
        }
    }
    if let Some(id) = filter.exclude {
        conditions.push("p.id <> ?".to_string());
        params.push(Value::from(id));
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        conditions.push(
            "(LOWER(p.title) LIKE ? OR LOWER(COALESCE(p.excerpt, '')) LIKE ?)".to_string(),
        );
        params.push(Value::from(pattern.clone()));
        params.push(Value::from(pattern));
    }

    (conditions.join(" AND "), params)
}

impl ContentStore for MySqlStore {
    fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let answer: Option<u8> = conn.query_first("SELECT 1")?;
        check_ping(answer)
    }

    fn post_ids_in_category(&self, category_slug: &str) -> Result<Vec<PostId>, StoreError> {
        let mut conn = self.conn()?;
        Ok(conn.exec(
            "SELECT pc.post_id FROM post_categories pc
             JOIN categories c ON c.id = pc.category_id
             WHERE c.slug = ?",
            (category_slug,),
        )?)
    }

    fn post_ids_with_tag(&self, tag_slug: &str) -> Result<Vec<PostId>, StoreError> {
        let mut conn = self.conn()?;
        Ok(conn.exec(
            "SELECT pt.post_id FROM post_tags pt
             JOIN tags t ON t.id = pt.tag_id
             WHERE t.slug = ?",
            (tag_slug,),
        )?)
    }

    fn post_ids_in_categories(&self, ids: &[CategoryId]) -> Result<Vec<PostId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        let params: Vec<Value> = ids.iter().map(|id| Value::from(*id)).collect();
        Ok(conn.exec(
            format!(
                "SELECT DISTINCT post_id FROM post_categories WHERE category_id IN ({})",
                placeholders(ids.len())
            ),
            params,
        )?)
    }

    fn select_posts(&self, filter: &PostFilter) -> Result<RowSet, StoreError> {
        let (conditions, mut params) = post_conditions(filter);
        let mut conn = self.conn()?;

        let total: Option<u64> = conn.exec_first(
            format!("SELECT COUNT(*) FROM posts p WHERE {}", conditions),
            params.clone(),
        )?;

        let direction = filter.direction.to_sql();
        let mut sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY {} {}, p.id {}",
            POST_COLUMNS,
            conditions,
            filter.sort.column(),
            direction,
            direction
        );
        if let Some(window) = filter.window {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::from(window.limit));
            params.push(Value::from(window.offset));
        }

        let rows: Vec<Row> = conn.exec(sql, params)?;
        let posts = rows
            .into_iter()
            .map(post_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RowSet {
            rows: self.join(&mut conn, posts)?,
            total: total.unwrap_or(0),
        })
    }

    fn select_post(
        &self,
        key: PostKey<'_>,
        audience: Audience,
    ) -> Result<Option<PostJoinRow>, StoreError> {
        let (conditions, mut params) = post_conditions(&PostFilter::new(audience));
        let key_condition = match key {
            PostKey::Slug(slug) => {
                params.push(Value::from(slug));
                "p.slug = ?"
            }
            PostKey::Id(id) => {
                params.push(Value::from(id));
                "p.id = ?"
            }
        };

        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            format!(
                "SELECT {} FROM posts p WHERE {} AND {} LIMIT 1",
                POST_COLUMNS, conditions, key_condition
            ),
            params,
        )?;
        let Some(row) = row else {
            return Ok(None);
        };

        let post = post_from(row)?;
        Ok(self.join(&mut conn, vec![post])?.pop())
    }

    fn slug_taken(
        &self,
        table: SlugTable,
        slug: &str,
        except: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let count: Option<u64> = conn.exec_first(
            format!(
                "SELECT COUNT(*) FROM {} WHERE slug = ? AND id <> ?",
                table.name()
            ),
            (slug, except.unwrap_or(0)),
        )?;
        Ok(count.unwrap_or(0) > 0)
    }

    fn increment_views(&self, slug: &str) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop("CALL increment_post_views(?)", (slug,))?;
        Ok(())
    }

    fn insert_post(&self, post: &PostWrite, author_id: &str) -> Result<PostId, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO posts
                (slug, title, excerpt, content, thumbnail, status, seo_title, seo_description,
                 author_id, published_at, created_at, updated_at)
            VALUES
                (:slug, :title, :excerpt, :content, :thumbnail, :status, :seo_title,
                 :seo_description, :author_id, :published_at, :at, :at)",
            params! {
                "slug" => &post.slug,
                "title" => &post.title,
                "excerpt" => post.excerpt.clone(),
                "content" => post.content.clone(),
                "thumbnail" => post.thumbnail.clone(),
                "status" => post.status.as_str(),
                "seo_title" => post.seo_title.clone(),
                "seo_description" => post.seo_description.clone(),
                "author_id" => author_id,
                "published_at" => post.published_at.map(format_time),
                "at" => format_time(post.at),
            },
        )?;
        Ok(conn.last_insert_id())
    }

    fn update_post(&self, id: PostId, post: &PostWrite) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        if !Self::exists(&mut conn, "posts", id, " AND deleted_at IS NULL")? {
            return Ok(false);
        }
        conn.exec_drop(
            "UPDATE posts SET
                slug = :slug, title = :title, excerpt = :excerpt, content = :content,
                thumbnail = :thumbnail, status = :status, seo_title = :seo_title,
                seo_description = :seo_description, published_at = :published_at,
                updated_at = :at
            WHERE id = :id",
            params! {
                "slug" => &post.slug,
                "title" => &post.title,
                "excerpt" => post.excerpt.clone(),
                "content" => post.content.clone(),
                "thumbnail" => post.thumbnail.clone(),
                "status" => post.status.as_str(),
                "seo_title" => post.seo_title.clone(),
                "seo_description" => post.seo_description.clone(),
                "published_at" => post.published_at.map(format_time),
                "at" => format_time(post.at),
                "id" => id,
            },
        )?;
        Ok(true)
    }

    fn soft_delete_post(&self, id: PostId, at: NaiveDateTime) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "UPDATE posts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
            (format_time(at), id),
        )?;
        Ok(conn.affected_rows() > 0)
    }

    fn replace_post_links(
        &self,
        post_id: PostId,
        category_ids: &[CategoryId],
        tag_ids: &[TagId],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let mut tx = conn.start_transaction(TxOpts::default())?;
        tx.exec_drop("DELETE FROM post_categories WHERE post_id = ?", (post_id,))?;
        tx.exec_batch(
            "INSERT INTO post_categories (post_id, category_id) VALUES (?, ?)",
            category_ids.iter().map(|id| (post_id, *id)),
        )?;
        tx.exec_drop("DELETE FROM post_tags WHERE post_id = ?", (post_id,))?;
        tx.exec_batch(
            "INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)",
            tag_ids.iter().map(|id| (post_id, *id)),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_categories(&self) -> Result<Vec<CategoryCountRow>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<Row> = conn.query(
            "SELECT c.id, c.name, c.slug, c.description, c.color, COUNT(p.id) AS post_count
             FROM categories c
             LEFT JOIN post_categories pc ON pc.category_id = c.id
             LEFT JOIN posts p ON p.id = pc.post_id
                AND p.status = 'published' AND p.deleted_at IS NULL
             GROUP BY c.id, c.name, c.slug, c.description, c.color
             ORDER BY c.name",
        )?;
        rows.into_iter()
            .map(|mut row| -> Result<CategoryCountRow, StoreError> {
                let id = take(&mut row, "id")?;
                Ok(CategoryCountRow {
                    category: category_from(&mut row, id)?,
                    post_count: take(&mut row, "post_count")?,
                })
            })
            .collect()
    }

    fn find_category(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            "SELECT id, name, slug, description, color FROM categories WHERE slug = ?",
            (slug,),
        )?;
        row.map(|mut row| -> Result<Category, StoreError> {
            let id = take(&mut row, "id")?;
            category_from(&mut row, id)
        })
        .transpose()
    }

    fn insert_category(&self, category: &CategoryWrite) -> Result<CategoryId, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO categories (name, slug, description, color) VALUES (?, ?, ?, ?)",
            (
                &category.name,
                &category.slug,
                category.description.clone(),
                category.color.clone(),
            ),
        )?;
        Ok(conn.last_insert_id())
    }

    fn update_category(
        &self,
        id: CategoryId,
        category: &CategoryWrite,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        if !Self::exists(&mut conn, "categories", id, "")? {
            return Ok(false);
        }
        conn.exec_drop(
            "UPDATE categories SET name = ?, slug = ?, description = ?, color = ? WHERE id = ?",
            (
                &category.name,
                &category.slug,
                category.description.clone(),
                category.color.clone(),
                id,
            ),
        )?;
        Ok(true)
    }

    fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM categories WHERE id = ?", (id,))?;
        Ok(conn.affected_rows() > 0)
    }

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let mut conn = self.conn()?;
        let rows: Vec<(TagId, String, String)> =
            conn.query("SELECT id, name, slug FROM tags ORDER BY name")?;
        Ok(rows
            .into_iter()
            .map(|(id, name, slug)| Tag { id, name, slug })
            .collect())
    }

    fn find_tag(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<(TagId, String, String)> =
            conn.exec_first("SELECT id, name, slug FROM tags WHERE slug = ?", (slug,))?;
        Ok(row.map(|(id, name, slug)| Tag { id, name, slug }))
    }

    fn insert_tag(&self, tag: &TagWrite) -> Result<TagId, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            "INSERT INTO tags (name, slug) VALUES (?, ?)",
            (&tag.name, &tag.slug),
        )?;
        Ok(conn.last_insert_id())
    }

    fn update_tag(&self, id: TagId, tag: &TagWrite) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        if !Self::exists(&mut conn, "tags", id, "")? {
            return Ok(false);
        }
        conn.exec_drop(
            "UPDATE tags SET name = ?, slug = ? WHERE id = ?",
            (&tag.name, &tag.slug, id),
        )?;
        Ok(true)
    }

    fn delete_tag(&self, id: TagId) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop("DELETE FROM tags WHERE id = ?", (id,))?;
        Ok(conn.affected_rows() > 0)
    }

    fn find_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let mut conn = self.conn()?;
        let row: Option<Row> = conn.exec_first(
            "SELECT id, full_name, headline, bio, avatar_url FROM profiles WHERE id = ?",
            (id,),
        )?;
        row.map(profile_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PostSort;

    #[test]
    fn ping_needs_the_expected_reply() {
        assert!(check_ping(Some(1)).is_ok());
        assert!(matches!(check_ping(None), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            check_ping(Some(0)),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_Off"), "%50\\%\\_off%");
    }

    #[test]
    fn public_filter_hides_drafts_and_deleted_rows() {
        let mut filter = PostFilter::new(Audience::Public);
        filter.ids = Some(vec![3, 7]);
        filter.search = Some("rust".to_string());
        filter.sort = PostSort::Title;
        let (sql, params) = post_conditions(&filter);
        assert_eq!(
            sql,
            "p.deleted_at IS NULL AND p.status = 'published' AND p.id IN (?, ?) \
             AND (LOWER(p.title) LIKE ? OR LOWER(COALESCE(p.excerpt, '')) LIKE ?)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn dashboard_filter_still_hides_deleted_rows() {
        let (sql, params) = post_conditions(&PostFilter::new(Audience::Dashboard));
        assert_eq!(sql, "p.deleted_at IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_id_restriction_matches_nothing() {
        let mut filter = PostFilter::new(Audience::Public);
        filter.ids = Some(Vec::new());
        let (sql, _) = post_conditions(&filter);
        assert!(sql.ends_with("AND FALSE"));
    }
}
