use indoc::indoc;

/// Schema dumps in the shape `supabase db dump` produces
pub mod dumps {
    use super::*;

    /// One object of every kind around a small books catalogue
    pub const BOOKS: &str = indoc! {r#"
        SET statement_timeout = 0;
        SET client_encoding = 'UTF8';

        CREATE SCHEMA IF NOT EXISTS "app";

        ALTER SCHEMA "app" OWNER TO "postgres";

        CREATE EXTENSION IF NOT EXISTS "pgcrypto" WITH SCHEMA "extensions";

        CREATE TYPE "public"."book_status" AS ENUM (
            'draft',
            'published'
        );

        CREATE OR REPLACE FUNCTION "public"."set_updated_at"() RETURNS "trigger"
            LANGUAGE "plpgsql"
            AS $$
        BEGIN
          NEW.updated_at := now();
          RETURN NEW;
        END;
        $$;

        SET default_tablespace = '';

        CREATE TABLE IF NOT EXISTS "public"."authors" (
            "id" bigint NOT NULL,
            "name" "text" NOT NULL
        );

        CREATE TABLE IF NOT EXISTS "public"."books" (
            "id" bigint NOT NULL,
            "author_id" bigint,
            "title" "text" NOT NULL,
            "status" "public"."book_status" DEFAULT 'draft'::"public"."book_status",
            "updated_at" timestamp with time zone DEFAULT "now"()
        );

        CREATE SEQUENCE IF NOT EXISTS "public"."books_id_seq"
            START WITH 1
            INCREMENT BY 1;

        CREATE OR REPLACE VIEW "public"."published_books" AS
         SELECT "id", "title" FROM "public"."books" WHERE ("status" = 'published'::"public"."book_status");

        ALTER TABLE ONLY "public"."books"
            ADD CONSTRAINT "books_pkey" PRIMARY KEY ("id");

        ALTER TABLE ONLY "public"."books"
            ADD CONSTRAINT "books_author_id_fkey" FOREIGN KEY ("author_id") REFERENCES "public"."authors"("id");

        CREATE INDEX "books_title_idx" ON "public"."books" USING "btree" ("title");

        CREATE OR REPLACE TRIGGER "set_books_updated_at" BEFORE UPDATE ON "public"."books" FOR EACH ROW EXECUTE FUNCTION "public"."set_updated_at"();

        CREATE POLICY "Books are public" ON "public"."books" FOR SELECT USING (true);

        COMMENT ON TABLE "public"."books" IS 'Catalogue; one row per edition';

        GRANT ALL ON TABLE "public"."books" TO "anon";
    "#};

    /// Two overloads of one function
    pub const OVERLOADED: &str = indoc! {r#"
        CREATE OR REPLACE FUNCTION "public"."add"("a" integer) RETURNS integer
            LANGUAGE "sql"
            AS $$ SELECT a + 1; $$;

        CREATE OR REPLACE FUNCTION "public"."add"("a" integer, "b" integer) RETURNS integer
            LANGUAGE "sql"
            AS $$ SELECT a + b; $$;
    "#};

    /// Hand-written SQL without quoted identifiers; nothing should match
    pub const UNQUOTED: &str = indoc! {r#"
        CREATE SCHEMA app;
        CREATE TABLE app.books (id bigint);
        CREATE INDEX books_id_idx ON app.books (id);
    "#};
}

/// Data-only dumps
pub mod data {
    use super::*;

    pub const BOOKS: &str = indoc! {r#"
        INSERT INTO "public"."authors" ("id", "name") VALUES (1, 'Ursula K. Le Guin');
        INSERT INTO "public"."books" ("id", "author_id", "title", "status") VALUES (1, 1, 'The Dispossessed', 'published');
    "#};
}
